mod top_by_key;

pub use top_by_key::*;
