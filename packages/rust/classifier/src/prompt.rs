//! Classification prompt construction.

use std::fmt::Write as _;

use creatorlens_shared::{Category, ContentSnapshot};

/// Worked examples for each category. The Influencer/Builder pair is the
/// one models confuse most, so both entries spell out the discriminator.
const EXAMPLES: [(Category, &str); 4] = [
    (
        Category::Influencer,
        "A founder who now mostly posts macro commentary and predictions; an \
         engineer at a well-known protocol whose feed is industry analysis \
         rather than their own releases; an investor sharing market takes. \
         Technical background does not make someone a Builder if their \
         current posts are commentary.",
    ),
    (
        Category::Builder,
        "Someone whose recent posts announce releases, show code or demos, \
         ask for feedback on a product they are shipping, or discuss \
         infrastructure they are actively working on.",
    ),
    (
        Category::Creative,
        "Artists minting NFTs, musicians dropping tracks, designers and \
         photographers sharing their work.",
    ),
    (
        Category::Lifestyle,
        "Fitness progress, food, travel diaries, family and daily life updates.",
    ),
];

/// Build the prompt for one creator. Same input, same prompt.
pub fn build_prompt(username: &str, snapshot: &ContentSnapshot) -> String {
    let user = &snapshot.user;
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are classifying a Farcaster (decentralized social network) account \
         by the kind of creator it primarily is.\n\n",
    );

    prompt.push_str("## Account\n");
    let _ = writeln!(prompt, "- Username: {username}");
    let _ = writeln!(
        prompt,
        "- Display name: {}",
        user.display_name.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(prompt, "- Bio: {}", snapshot.bio());
    let _ = writeln!(prompt, "- Followers: {}", count_or_unknown(user.follower_count));
    let _ = writeln!(prompt, "- Following: {}", count_or_unknown(user.following_count));

    let _ = writeln!(
        prompt,
        "\n## Popular casts ({} total)",
        snapshot.cast_texts.len()
    );
    for (i, text) in snapshot.cast_texts.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}\n", i + 1, text);
    }

    prompt.push_str("## Categories\n");
    for (i, category) in Category::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}: {}", i + 1, category, category.description());
    }

    prompt.push_str("\n## Examples\n");
    for (category, example) in EXAMPLES {
        let _ = writeln!(prompt, "- {category}: {example}");
    }

    prompt.push_str(
        "\n## Task\n\
         Decide the account's primary category from its bio and casts. Weigh the \
         follower count, and separate commentary and thought leadership \
         (Influencer) from hands-on building and shipping (Builder) by what the \
         account does now, not by background.\n\n\
         ## Output\n\
         Reply with a single JSON object and nothing else:\n\
         {\n\
         \x20 \"primary_classification\": \"<Builder | Creative | Influencer | Lifestyle>\",\n\
         \x20 \"confidence\": \"<High | Medium | Low>\",\n\
         \x20 \"reasoning\": \"<2-3 sentences grounded in the bio and casts>\",\n\
         \x20 \"secondary_traits\": [\"<optional other notable traits>\"]\n\
         }\n",
    );

    prompt
}

fn count_or_unknown(count: Option<u64>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}
