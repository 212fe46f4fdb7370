pub mod chatmodel;
pub mod dealmodel;
pub mod usermodel;
