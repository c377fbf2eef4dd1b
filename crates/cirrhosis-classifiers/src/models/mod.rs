pub mod classifier_trait;
pub mod factory;
pub mod gbdt;
#[cfg(feature = "linfa")]
pub mod logistic;
pub mod random_forest;
pub mod registry;
