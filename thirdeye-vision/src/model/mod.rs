mod assets;
mod yolo;

pub use assets::ModelAssets;
pub use yolo::YoloNetwork;
