use serde_json::json;

use super::{
    preview, LevelBand, RenderedPrompt, BLOCKED_PREVIEW_LIMIT, FAVORITES_PREVIEW_LIMIT,
    HISTORY_PREVIEW_LIMIT, INTERESTS_PREVIEW_LIMIT,
};
use crate::models::{InterestTopic, LexicalMapRequest, RelatedWordCandidate};

const LAYER1_SYSTEM: &str =
    "You are a lexicographer in the style of John Sinclair's Cobuild dictionary.";
const LAYER2_SYSTEM: &str = "You are a language coach creating realistic, current examples.";
const LAYER3_SYSTEM: &str = "You are an experienced ESL teacher identifying common errors.";
const LAYER4_SYSTEM: &str = "You are a vocabulary coach building connections.";
const CANDIDATES_SYSTEM: &str =
    "You are a vocabulary coach who quickly recalls words related to a headword.";
const PERSONALIZED_SYSTEM: &str =
    "You are a warm vocabulary coach who writes short personalized notes in Simplified Chinese.";
const INTERESTS_SYSTEM: &str =
    "You are an assistant that organizes a single learner's reading interests into a few stable topics.";

/// Stateless renderer for every stage prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptRenderer;

impl PromptRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn layer1(&self, word: &str, context: &str, english_level: Option<&str>) -> RenderedPrompt {
        let level_note = english_level
            .filter(|l| !l.trim().is_empty())
            .map(layer1_level_note)
            .unwrap_or_default();

        let user = format!(
            r#"Task: Explain the meaning of "{word}" in the given context using Cobuild-style learner-dictionary language.

Write ONE short explanation, in 1-2 sentences (maximum 60 words total), that:
1. Describes what happens in real life when people use this word
2. Focuses on situations and intentions, not grammar jargon
3. Includes the headword "{word}" once near the beginning of the first sentence
4. Feels like it comes from a learner's dictionary entry

Formatting rules (very important):
- Output ONLY the explanation sentence(s).
- Do NOT include separate example sentences, translations, bullet points, quotes, markdown, or notes in parentheses.
- Do NOT mention learners, CEFR levels, definitions, prompts, or context sentences.

Word: {word}
Context sentence: {context}{level_note}

Return only the explanation sentence(s)."#
        );

        RenderedPrompt::new(Some(LAYER1_SYSTEM), user)
    }

    pub fn layer2(&self, word: &str, context: &str) -> RenderedPrompt {
        let user = format!(
            r#"Task: Generate 3 distinct, authentic example sentences for "{word}", each from a different source:

1. **Twitter/Social Media**: Casual, conversational tone (max 280 chars)
2. **News (BBC/NYT style)**: Formal, objective, journalistic
3. **Academic/Professional**: Precise, technical, sophisticated

Requirements:
- Each example must feel natural and current
- Include enough context to understand the situation
- Use the word "{word}" naturally, not forced

Word: {word}
Original context: {context}

Return as a JSON array with this exact structure:
[
  {{"source": "twitter", "text": "..."}},
  {{"source": "news", "text": "..."}},
  {{"source": "academic", "text": "..."}}
]"#
        );

        RenderedPrompt::new(Some(LAYER2_SYSTEM), user)
    }

    pub fn layer3(&self, word: &str, context: &str, english_level: Option<&str>) -> RenderedPrompt {
        let level_note = english_level
            .filter(|l| !l.trim().is_empty())
            .map(layer3_level_note)
            .unwrap_or_default();

        let user = format!(
            r#"Task: Identify the 2 most important mistakes non-native speakers make with "{word}".

Requirements:
- Each mistake MUST use the target word "{word}" in both the wrong and correct sentences.
- The 2 mistakes MUST focus on different typical problems (for example one about grammar or form, the other about collocation or meaning).
- Do NOT give two variants of the same error type.

For each mistake, provide:
1. wrong: incorrect example sentence in English, using "{word}"
2. why: brief explanation in Simplified Chinese
3. correct: corrected sentence in English, using "{word}"

Word: {word}
Context sentence: {context}{level_note}

Return as a JSON array with this exact structure:
[
  {{"wrong": "...", "why": "...", "correct": "..."}},
  {{"wrong": "...", "why": "...", "correct": "..."}}
]"#
        );

        RenderedPrompt::new(Some(LAYER3_SYSTEM), user)
    }

    /// Fast recall of related-word leads; only `word` and `relationship`.
    pub fn layer4_candidates(&self, word: &str, context: &str) -> RenderedPrompt {
        let user = format!(
            r#"Task: List up to 5 words or short phrases that help a learner understand "{word}" in this context.

For each item give only:
- word: the related word or phrase (1-3 words, never a sentence, no Chinese)
- relationship: one of synonym, antonym, narrower, broader, collocate

Word: {word}
Context: {context}

Return ONLY a JSON array:
[
  {{"word": "...", "relationship": "synonym"}}
]"#
        );

        RenderedPrompt::new(Some(CANDIDATES_SYSTEM), user)
    }

    /// Full related-words prompt grounded on the recalled candidates.
    pub fn layer4_enrichment(
        &self,
        input: &LexicalMapRequest,
        candidates: &[RelatedWordCandidate],
    ) -> RenderedPrompt {
        let word = input.word.as_str();
        let context = input.context.as_str();
        let personalization = personalization_notes(input);
        let history = json!(input
            .learning_history
            .iter()
            .take(HISTORY_PREVIEW_LIMIT)
            .collect::<Vec<_>>());

        let candidates_note = if candidates.is_empty() {
            String::new()
        } else {
            let listed = serde_json::to_string(candidates).unwrap_or_default();
            format!(
                "\nCandidate related words from a quick first pass (you may drop or replace weak ones):\n{listed}\n"
            )
        };

        let user = format!(
            r#"Task: Recommend 2 related words/phrases that help learners understand "{word}" better.

For each related word, provide:
- word: related word or short phrase ONLY (1-3 words, never a full sentence, no Chinese)
- relationship: synonym/antonym/narrower/broader/collocate
- difference: how it differs from "{word}"
- when_to_use: usage guidance

Personalized coaching (Chinese):
- Always include a "personalized" field in the JSON response.
- The "personalized" value must be written in Simplified Chinese, 1-3 short sentences that speak directly to the learner.
- Use concrete scenes from everyday life to help them feel the word.
{personalization}{candidates_note}
Word: {word}
Context: {context}
Learning history (may be empty): {history}

Return as JSON with this structure:
{{
  "related_words": [
    {{"word": "...", "relationship": "...", "difference": "...", "when_to_use": "..."}}
  ],
  "personalized": "..."
}}"#
        );

        RenderedPrompt::new(Some(LAYER4_SYSTEM), user)
    }

    /// Prose-only coaching text, streamed alongside the structured stage.
    pub fn layer4_personalized(&self, input: &LexicalMapRequest) -> RenderedPrompt {
        let word = input.word.as_str();
        let context = input.context.as_str();
        let personalization = personalization_notes(input);

        let user = format!(
            r#"Task: Write a short personalized note in Simplified Chinese that helps this learner feel the meaning of "{word}" in the context below.

Rules:
- 1-3 short sentences, speaking directly to the learner.
- Use a concrete everyday scene or analogy.
- Output ONLY the note. No JSON, no markdown, no headings.
{personalization}
Word: {word}
Context: {context}"#
        );

        RenderedPrompt::new(Some(PERSONALIZED_SYSTEM), user)
    }

    pub fn interests(
        &self,
        word: &str,
        context: &str,
        page_type: Option<&str>,
        url: Option<&str>,
        existing_topics: &[InterestTopic],
        blocked_titles: &[String],
    ) -> RenderedPrompt {
        let page_type = page_type.filter(|s| !s.is_empty()).unwrap_or("unknown");
        let url = url.filter(|s| !s.is_empty()).unwrap_or("unknown");
        let existing = serde_json::to_string(existing_topics).unwrap_or_else(|_| "[]".to_string());
        let blocked = serde_json::to_string(blocked_titles).unwrap_or_else(|_| "[]".to_string());

        let user = format!(
            r#"Latest LexiLens usage:
- word: {word}
- context: {context}
- page_type: {page_type}
- url: {url}

Existing topics (may be empty). Each has an id, title, summary and example URLs:
{existing}

Blocked titles (topics removed by the user; NEVER bring them back): {blocked}

Task:
1. Decide whether this latest usage should be merged into one existing topic, create a new topic, or be ignored if it does not represent a meaningful interest.
2. Always return the FULL list of topics the extension should store after this update.
3. Each topic object must contain:
   - id: short stable identifier (slug-like, no spaces)
   - title: short Chinese or bilingual title
   - summary: 1 short sentence in Chinese describing what the learner does or follows
   - urls: array of URLs belonging to this topic; include the latest URL when appropriate
4. If you update an existing topic, keep its id exactly the same.
5. Never create or return topics whose title is in the blocked titles list.

Return ONLY a JSON array of topic objects, without any surrounding explanation."#
        );

        RenderedPrompt::new(Some(INTERESTS_SYSTEM), user)
    }

    pub fn lexical_image(&self, base_word: &str, related_word: &str) -> String {
        format!(
            r#"Draw an XKCD style colored manga depicting and explaining the difference between the word "{base_word}" and "{related_word}" to learners using English, with "LexiLens" written at the bottom right corner without any logos or icons"#
        )
    }
}

/// History, favorites, interests, blocklist and level notes for stage 4.
fn personalization_notes(input: &LexicalMapRequest) -> String {
    let mut notes = String::new();

    let history = preview(&input.learning_history, HISTORY_PREVIEW_LIMIT);
    if !history.is_empty() {
        notes.push_str(&format!(
            "\nThe learner has previously studied these words: {history}.\nConnect this word to what they already know when it helps.\n"
        ));
    }

    let favorites = preview(&input.favorite_words, FAVORITES_PREVIEW_LIMIT);
    if !favorites.is_empty() {
        notes.push_str(&format!(
            "\nWords the learner marked as favorites: {favorites}.\n"
        ));
    }

    let topics: Vec<String> = input
        .interests
        .iter()
        .take(INTERESTS_PREVIEW_LIMIT)
        .filter(|t| !t.title.trim().is_empty())
        .map(|t| {
            if t.summary.trim().is_empty() {
                format!("- {}", t.title.trim())
            } else {
                format!("- {}: {}", t.title.trim(), t.summary.trim())
            }
        })
        .collect();

    if topics.is_empty() {
        notes.push_str(
            "\nThe learner has not provided specific long-term interest topics.\nImagine warm, everyday scenes from study, life, or work that fit the context.\n",
        );
    } else {
        notes.push_str(&format!(
            "\nLearner interest topics (for personalization):\n{}\n\nPrefer 1-2 of these topics for short analogies or scenes when they fit the word \"{}\".\n",
            topics.join("\n"),
            input.word
        ));
    }

    let blocked = preview(&input.blocked_titles, BLOCKED_PREVIEW_LIMIT);
    if !blocked.is_empty() {
        notes.push_str(&format!(
            "\nImportant constraint:\n- Never mention these blocked topics or phrases: {blocked}\n"
        ));
    }

    if let Some(level) = input.english_level.as_deref().filter(|l| !l.trim().is_empty()) {
        notes.push_str(&layer4_level_note(level));
    }

    notes
}

fn layer1_level_note(level: &str) -> String {
    let guidance = match LevelBand::from_hint(level) {
        LevelBand::Beginner => {
            "For this learner, write in very simple English:\n\
             - Use high-frequency A1-A2 vocabulary and short sentences, ideally no more than 35 words.\n\
             - Avoid abstract nouns, idioms, and long subordinate clauses.\n\
             - Do NOT mention real people, countries, or news events.\n\
             - Explain advanced headwords through everyday actions (school, family, simple work)."
        }
        LevelBand::Intermediate => {
            "For this learner, use clear, natural English at about B1-B2 level:\n\
             - You can include some less common words, but keep sentences concise.\n\
             - Prefer everyday or basic work situations rather than technical or legal jargon."
        }
        LevelBand::Advanced => {
            "For this learner, you may use more precise or academic vocabulary:\n\
             - You can mention subtle meaning differences when helpful.\n\
             - Keep the explanation focused and readable."
        }
        LevelBand::Unknown => "Use language that feels natural, clear, and accessible for this level.",
    };

    format!("\n\nLearner profile:\n- Approximate CEFR level: {level}\n\n{guidance}")
}

fn layer3_level_note(level: &str) -> String {
    let guidance = match LevelBand::from_hint(level) {
        LevelBand::Beginner => {
            "When creating WRONG and CORRECT example sentences:\n\
             - Use simple A1-A2 vocabulary and grammar, active voice, short sentences.\n\
             - Keep scenes very simple (school, family, daily life).\n\
             - Do NOT use examples about government, law, politics, or real people.\n\
             For the Chinese explanations, use short, friendly everyday Chinese without grammar jargon."
        }
        LevelBand::Intermediate => {
            "When creating examples:\n\
             - Use natural B1-B2 English with clear structure.\n\
             - Common grammar terms in Chinese are fine, but keep explanations short."
        }
        LevelBand::Advanced => {
            "When creating examples:\n\
             - You may use more advanced vocabulary or subtle meaning differences.\n\
             - Briefly mentioning detailed grammar ideas in Chinese is acceptable."
        }
        LevelBand::Unknown => {
            "Adjust the difficulty so it feels encouraging and not overwhelming for this learner."
        }
    };

    format!("\n\nLearner profile:\n- Approximate CEFR level: {level}\n\n{guidance}")
}

fn layer4_level_note(level: &str) -> String {
    let guidance = match LevelBand::from_hint(level) {
        LevelBand::Beginner => {
            "For this learner:\n\
             - Choose high-frequency related words that are not much harder than the headword.\n\
             - Keep \"difference\" and \"when_to_use\" short, mainly in Simplified Chinese.\n\
             - Use neutral everyday scenes; no government, law, crime, or real people."
        }
        LevelBand::Intermediate => {
            "For this learner:\n\
             - Use clear B1-B2 English and keep explanations concise.\n\
             - Focus on typical exam, work, or study situations."
        }
        LevelBand::Advanced => {
            "For this learner:\n\
             - You may include precise academic or professional vocabulary.\n\
             - Highlight subtle meaning and register differences when helpful."
        }
        LevelBand::Unknown => {
            "Adjust the difficulty of your coaching so it feels encouraging and not overwhelming."
        }
    };

    format!(
        "\nThe learner's approximate CEFR level is {level}. Do NOT mention CEFR or levels explicitly.\n{guidance}\n"
    )
}
