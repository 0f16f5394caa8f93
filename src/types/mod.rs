pub mod bounding_box;
pub mod cadence;
pub mod interval;
pub mod sector;
pub mod speed_bins;
pub mod station;
