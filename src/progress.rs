use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Numbered-step spinner on stderr. Hidden when quiet.
pub struct Progress {
    pb: ProgressBar,
    total_steps: usize,
    step_start: Instant,
}

impl Progress {
    pub fn new(total_steps: usize, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
                pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
            }
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        };
        Progress { pb, total_steps, step_start: Instant::now() }
    }

    pub fn hidden() -> Self {
        Progress::new(0, true)
    }

    pub fn start(&mut self, step: usize, msg: &str) {
        self.step_start = Instant::now();
        self.pb.set_message(format!("[{step}/{}] {msg}...", self.total_steps));
    }

    /// Prints a completed step line with its duration and a short detail.
    pub fn finish_step(&self, step: usize, label: &str, detail: &str) {
        let elapsed = fmt_dur(self.step_start.elapsed());
        self.pb.println(format!("  ✓ [{step}/{}] {label:<36} {elapsed:>7}  {detail}", self.total_steps));
    }

    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

pub fn fmt_dur(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1000 { format!("{:.1}s", d.as_secs_f64()) } else { format!("{ms}ms") }
}
