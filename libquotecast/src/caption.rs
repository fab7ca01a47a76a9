//! Caption building with randomized hashtags

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::Quote;

pub const HASHTAG_POOL: &[&str] = &[
    "motivation",
    "success",
    "inspiration",
    "quotes",
    "mindset",
    "growth",
    "positivity",
    "wisdom",
    "goals",
    "entrepreneur",
    "leadership",
    "business",
    "personaldevelopment",
    "successquotes",
    "motivationalquotes",
    "inspirationalquotes",
    "quoteoftheday",
];

pub const MIN_HASHTAGS: usize = 5;
pub const MAX_HASHTAGS: usize = 8;

/// Between 5 and 8 distinct hashtags from the pool, in random order
pub fn random_hashtags() -> Vec<String> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(MIN_HASHTAGS..=MAX_HASHTAGS);
    HASHTAG_POOL
        .choose_multiple(&mut rng, count)
        .map(|tag| format!("#{}", tag))
        .collect()
}

pub fn build_caption(quote: &Quote, hashtags: &[String]) -> String {
    format!(
        "{}\n\n\u{2014} {}\n\n{}",
        quote.content,
        quote.author,
        hashtags.join(" ")
    )
}
