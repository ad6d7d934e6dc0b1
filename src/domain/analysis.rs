//! Local heuristics over plain text: counts, reading time and a keyword
//! sentiment label. None of this inspects meaning.

use super::style::Sentiment;
use serde::{Deserialize, Serialize};

const WORDS_PER_MINUTE: usize = 200;

const POSITIVE_STEMS: &[&str] = &[
    "good", "great", "excellent", "amazing", "happy", "positive", "wonderful", "success",
    "perfect",
];

const NEGATIVE_STEMS: &[&str] = &[
    "bad", "awful", "terrible", "horrible", "sad", "negative", "failure", "defect", "problem",
];

const EXTENDED_POSITIVE_STEMS: &[&str] = &[
    "good", "great", "excellent", "amazing", "happy", "positive", "wonderful", "success",
    "perfect", "better", "best", "effective", "benefit", "advantage", "promising", "hope",
    "solution", "innovat", "win", "joy", "pleasure", "satisf", "pleasant", "beautiful",
    "praise", "advance", "progress", "achiev", "victory", "ease", "gain", "growth",
    "opportunit", "reward", "celebrat", "triumph", "beauty", "admirable", "charming",
    "inspir", "efficient", "favorable", "gratifying",
];

const EXTENDED_NEGATIVE_STEMS: &[&str] = &[
    "bad", "awful", "terrible", "horrible", "sad", "negative", "failure", "defect", "problem",
    "fail", "risk", "danger", "worry", "concern", "crisis", "difficult", "limitation",
    "conflict", "loss", "damage", "error", "harm", "disadvantage", "adversity", "obstacle",
    "decline", "disappoint", "dissatisf", "inadequate", "ineffective", "inefficient",
    "disaster", "catastroph", "destruction", "threat", "trauma", "collapse", "defeat",
    "bankrupt", "critic", "questionable", "insufficient", "regrettable", "undesirable",
    "decadent", "chaos",
];

// Portuguese lexicon, checked alongside the English one since output keeps the
// language of its input. "mal" is left out: it matches inside "normal" and "formal".
const POSITIVE_STEMS_PT: &[&str] = &[
    "bom", "ótimo", "excelente", "incrível", "feliz", "positivo", "maravilhos", "sucesso",
    "perfeit",
];

const NEGATIVE_STEMS_PT: &[&str] = &[
    "ruim", "péssim", "terrível", "horrível", "triste", "negativo", "fracasso", "defeito",
    "problema",
];

const EXTENDED_POSITIVE_STEMS_PT: &[&str] = &[
    "bom", "ótimo", "excelente", "incrível", "feliz", "positivo", "maravilhos", "sucesso",
    "perfeit", "melhor", "eficaz", "benefício", "vantagem", "promissor", "esperança",
    "solução", "inovação", "vencer", "alegria", "prazer", "satisfação", "agradável", "bonito",
    "satisfatório", "elogio", "avanço", "progresso", "conquista", "vitória", "facilidade",
    "ganho", "crescimento", "oportunidade", "recompensa", "celebração", "êxito", "triunfo",
    "beleza", "admirável", "encantador", "inspirador", "eficiente", "favorável", "gratificante",
];

const EXTENDED_NEGATIVE_STEMS_PT: &[&str] = &[
    "ruim", "péssim", "terrível", "horrível", "triste", "negativo", "fracasso", "defeito",
    "problema", "falha", "risco", "perigo", "preocupação", "crise", "dificuldade", "limitação",
    "conflito", "perda", "dano", "erro", "prejuízo", "desvantagem", "adversidade", "obstáculo",
    "queda", "decepção", "insatisfação", "inadequad", "ineficaz", "ineficiente", "desastre",
    "catástrofe", "destruição", "ameaça", "trauma", "colapso", "derrota", "falência", "crítica",
    "questionável", "insuficiente", "lamentável", "indesejável", "decadente", "caos",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub word_count: usize,
    pub char_count: usize,
    pub sentence_count: usize,
    pub read_time_minutes: usize,
    pub sentiment_score: i64,
    pub sentiment: Sentiment,
}

/// Percent change per metric between an original text and its rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDiff {
    pub word_count: i64,
    pub char_count: i64,
    pub sentence_count: i64,
    pub read_time_minutes: i64,
}

impl AnalysisDiff {
    pub fn between(original: &TextAnalysis, updated: &TextAnalysis) -> Self {
        Self {
            word_count: percentage_diff(original.word_count, updated.word_count),
            char_count: percentage_diff(original.char_count, updated.char_count),
            sentence_count: percentage_diff(original.sentence_count, updated.sentence_count),
            read_time_minutes: percentage_diff(
                original.read_time_minutes,
                updated.read_time_minutes,
            ),
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

pub fn read_time_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

pub fn percentage_diff(original: usize, updated: usize) -> i64 {
    if original == 0 {
        return if updated > 0 { 100 } else { 0 };
    }
    let delta = updated as f64 - original as f64;
    (delta / original as f64 * 100.0).round() as i64
}

struct SentimentTally {
    positive: usize,
    negative: usize,
    total: usize,
}

impl SentimentTally {
    fn score(&self) -> i64 {
        self.positive as i64 - self.negative as i64
    }
}

fn tally(text: &str, positive: &[&[&str]], negative: &[&[&str]]) -> SentimentTally {
    let lowered = text.to_lowercase();
    let mut tally = SentimentTally {
        positive: 0,
        negative: 0,
        total: 0,
    };

    for word in lowered.split_whitespace() {
        tally.total += 1;
        if positive.iter().flat_map(|l| l.iter()).any(|stem| word.contains(stem)) {
            tally.positive += 1;
        }
        if negative.iter().flat_map(|l| l.iter()).any(|stem| word.contains(stem)) {
            tally.negative += 1;
        }
    }

    tally
}

fn label_for_score(score: i64) -> Sentiment {
    match score {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

fn base_analysis(text: &str, score: i64, sentiment: Sentiment) -> TextAnalysis {
    let words = word_count(text);
    TextAnalysis {
        word_count: words,
        char_count: text.chars().count(),
        sentence_count: sentence_count(text),
        read_time_minutes: read_time_minutes(words),
        sentiment_score: score,
        sentiment,
    }
}

/// Counts plus the plain sign-of-score sentiment label.
pub fn analyze(text: &str) -> TextAnalysis {
    let score = tally(
        text,
        &[POSITIVE_STEMS, POSITIVE_STEMS_PT],
        &[NEGATIVE_STEMS, NEGATIVE_STEMS_PT],
    )
    .score();
    base_analysis(text, score, label_for_score(score))
}

/// Analysis for generated prose: larger lexicon and proportional thresholds.
pub fn analyze_generated(text: &str) -> TextAnalysis {
    let tally = tally(
        text,
        &[EXTENDED_POSITIVE_STEMS, EXTENDED_POSITIVE_STEMS_PT],
        &[EXTENDED_NEGATIVE_STEMS, EXTENDED_NEGATIVE_STEMS_PT],
    );
    let score = tally.score();
    let words = word_count(text);

    let (positive_pct, negative_pct) = if tally.total == 0 {
        (0.0, 0.0)
    } else {
        (
            tally.positive as f64 / tally.total as f64 * 100.0,
            tally.negative as f64 / tally.total as f64 * 100.0,
        )
    };

    let mut sentiment = Sentiment::Neutral;
    if score > 3 || positive_pct > 5.0 {
        sentiment = Sentiment::Positive;
    }
    if score < -3 || negative_pct > 5.0 {
        sentiment = Sentiment::Negative;
    }

    if negative_pct > 10.0 && negative_pct > positive_pct * 1.5 {
        sentiment = Sentiment::Negative;
    } else if positive_pct > 10.0 && positive_pct > negative_pct * 1.5 {
        sentiment = Sentiment::Positive;
    }

    // Short texts: every keyword counts.
    if words < 100 && score != 0 {
        sentiment = label_for_score(score);
    }

    base_analysis(text, score, sentiment)
}
