pub mod extractor;
pub mod jwt;
pub mod mailer;
pub mod test_utils;
