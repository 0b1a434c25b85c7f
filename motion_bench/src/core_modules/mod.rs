pub mod binarizer;
pub mod differencer;
pub mod frame;
pub mod morphology;
pub mod motion_detector;
pub mod region;
pub mod region_extractor;
pub mod run_statistics;
pub mod smoother;
