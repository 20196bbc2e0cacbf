//! Content Verification Questions
//!
//! Each task type has a pool of questions about the target content. One
//! question is chosen uniformly at random when a submission is created
//! and frozen into it; it is never regenerated for that submission, so a
//! user who refreshes still has to answer the question they were shown.

use rand::seq::SliceRandom;

use crate::validation::rules::TaskType;

const LIKE_QUESTIONS: &[&str] = &[
    "What is the main subject of the post you liked?",
    "What color stands out most in the post?",
    "Is the post a photo, a video, or text?",
    "What is the first word of the post's caption?",
    "How many people appear in the post?",
    "What emotion does the post convey?",
    "Is the post indoors or outdoors?",
    "What object is closest to the center of the post?",
    "Does the post include any visible text overlay?",
    "What time of day does the post appear to show?",
    "What is the poster's display name?",
    "Is there an animal anywhere in the post?",
];

const COMMENT_QUESTIONS: &[&str] = &[
    "What topic does the post you commented on discuss?",
    "What is the main subject shown in the post?",
    "What word appears in the post's caption?",
    "How would you describe the tone of the post?",
    "What color is most prominent in the post?",
    "Is the post a photo, a video, or plain text?",
    "What did the caption ask viewers to do, if anything?",
    "How many hashtags does the caption use?",
    "What is the first word of your own comment?",
    "Does the post show a product, a person, or a place?",
    "What emotion is the post trying to evoke?",
    "Is the post part of a series or a standalone?",
];

const FOLLOW_QUESTIONS: &[&str] = &[
    "What does the account you followed mainly post about?",
    "What is in the account's profile picture?",
    "What is the first word of the account's bio?",
    "Roughly how many posts does the account have?",
    "Is the account personal, brand, or creator?",
    "What color dominates the account's profile page?",
    "What is the most recent post about?",
    "Does the account's bio contain a link?",
    "Does the account use a logo or a face as its avatar?",
    "What language does the account mostly post in?",
    "Is the most recent post a photo or a video?",
    "What is one hashtag the account uses regularly?",
];

const WATCH_QUESTIONS: &[&str] = &[
    "What happens in the first ten seconds of the video?",
    "What is the video's main topic?",
    "Who speaks first in the video?",
    "What is shown in the video's thumbnail?",
    "Does the video have background music?",
    "What color is the presenter wearing?",
    "Where does the video appear to be filmed?",
    "What is said or shown at the very end?",
    "Roughly how long is the video?",
    "What product, place, or person is featured?",
    "Is there on-screen text during the video?",
    "What is the first word of the video's title?",
];

const VISIT_QUESTIONS: &[&str] = &[
    "What is the main headline on the page you visited?",
    "What does the site appear to sell or offer?",
    "What color is the site's main navigation bar?",
    "What is the first menu item in the site header?",
    "Does the page show any pricing information?",
    "What image appears at the top of the page?",
    "What is the name shown in the site's logo?",
    "Does the page have a signup or contact form?",
    "What is one product or article featured on the page?",
    "What language is the page written in?",
    "Is there a video embedded on the page?",
    "What appears in the page footer?",
];

/// Pools of candidate verification questions, keyed by task type.
#[derive(Debug, Clone, Default)]
pub struct QuestionPool;

impl QuestionPool {
    pub fn pool_for(task_type: TaskType) -> &'static [&'static str] {
        match task_type {
            TaskType::Like => LIKE_QUESTIONS,
            TaskType::Comment => COMMENT_QUESTIONS,
            TaskType::Follow => FOLLOW_QUESTIONS,
            TaskType::Watch => WATCH_QUESTIONS,
            TaskType::Visit => VISIT_QUESTIONS,
        }
    }

    /// Choose one question uniformly at random. Called exactly once per
    /// submission, at creation.
    pub fn pick(task_type: TaskType) -> String {
        let pool = Self::pool_for(task_type);
        pool.choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Describe the content you engaged with.")
            .to_string()
    }
}
