pub mod change_miner;
pub mod intersector;
pub mod language;
