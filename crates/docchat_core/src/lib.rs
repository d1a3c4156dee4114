pub mod conversation;
pub mod domain;
pub mod otp;
pub mod ports;

pub use domain::{
    AuthProvider, Chat, ChatMessage, Document, DocumentSummary, FederatedProfile, Identity,
    MessageRole, OutgoingEmail, User,
};
pub use otp::{OneTimeCode, OtpError};
pub use ports::{
    AnswerGenerationService, DatabaseService, IdentityProviderService, MailService, PortError,
    PortResult, TextExtractionService,
};
