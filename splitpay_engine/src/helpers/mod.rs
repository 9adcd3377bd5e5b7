mod split;

pub use split::{money_split, SplitConfig, SplitError};
