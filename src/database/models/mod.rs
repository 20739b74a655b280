// Database models - Re-exports all entity models
//
// Each file declares one table: its schema descriptor, typed row and enums.
// - user.rs, role.rs: accounts and meeting permissions
// - meeting.rs, participant.rs: meetings and who is in them
// - chat.rs: in-meeting chat
// - question.rs, attempt.rs, subjective_attempt.rs: quizzes

mod user;
mod role;
mod meeting;
mod participant;
mod chat;
mod question;
mod attempt;
mod subjective_attempt;

pub use user::User;
pub use role::Role;
pub use meeting::{Meeting, MeetingStatus};
pub use participant::Participant;
pub use chat::{Chat, ChatType};
pub use question::{Question, QuestionKind};
pub use attempt::Attempt;
pub use subjective_attempt::SubjectiveAttempt;

use super::schema::{Entity, EntitySchema};

/// Every model descriptor, in registration order
pub fn all_schemas() -> Vec<&'static EntitySchema> {
    vec![
        User::schema(),
        Role::schema(),
        Meeting::schema(),
        Participant::schema(),
        Chat::schema(),
        Question::schema(),
        Attempt::schema(),
        SubjectiveAttempt::schema(),
    ]
}
