//! Concrete collaborators: Slack as the chat platform, GitHub as the
//! review-request source.

pub mod github;
pub mod slack;

pub use github::GithubClient;
pub use slack::SlackClient;
