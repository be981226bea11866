pub mod classification_result;
pub mod genre_model;
pub mod label_table;
