pub mod assembler;
pub mod config;
pub mod data;
pub mod labels;
pub mod model;

pub use assembler::{LatestFeatures, MlDataAssembler};
pub use config::{MlDataConfig, WarmupPolicy};
pub use data::MlData;
pub use labels::{LabelGenerator, TieBreak};
pub use model::{KnnClassifier, LoadedModel, ModelDetails, Predictor, Scaler, Trainable};
