pub mod doctor;
pub mod export;
pub mod inspect;
pub mod stats;
