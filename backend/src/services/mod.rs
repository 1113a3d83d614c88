pub mod clerk;
pub mod mailer;
pub mod razorpay;
