pub mod clock;
pub mod db;
pub mod email;
pub mod html;
pub mod messages;
pub mod models;
pub mod storage;
pub mod threadrand;
pub mod token;
pub mod validators;
