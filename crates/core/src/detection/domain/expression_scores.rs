/// Per-face probability for each expression label, in the classifier's
/// native key order.
///
/// Labels stay as strings: a classifier may report a label outside
/// [`Emotion`](super::emotion::Emotion), and presentation handles that
/// with a fallback rather than the domain rejecting it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionScores {
    entries: Vec<(String, f64)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a score, clamped to [0, 1]. Re-inserting a label replaces
    /// its score but keeps its original position.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((label, score)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    /// Label with the highest score; on ties the first-encountered label wins.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        self.iter().fold(None, |best, (label, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((label, score)),
        })
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ExpressionScores {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (label, score) in iter {
            scores.insert(label, score);
        }
        scores
    }
}
