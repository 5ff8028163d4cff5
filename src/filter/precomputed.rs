use std::collections::HashMap;
use std::path::Path;

use crate::error::AlignmentError;
use crate::pipeline::traits::AcceptabilityScorer;

/// Scores looked up by audio file stem, from a `{stem: score}` JSON map
/// produced by an external scoring run.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedScorer {
    scores: HashMap<String, f32>,
}

impl PrecomputedScorer {
    pub fn new(scores: HashMap<String, f32>) -> Self {
        Self { scores }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io(format!("read scores {}", path.display()), e))?;
        let scores = serde_json::from_str(&data)
            .map_err(|e| AlignmentError::json(format!("parse scores {}", path.display()), e))?;
        Ok(Self::new(scores))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl AcceptabilityScorer for PrecomputedScorer {
    fn score(&self, audio_path: &Path, _transcript: &str) -> Result<f32, AlignmentError> {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        self.scores.get(stem.as_ref()).copied().ok_or_else(|| {
            AlignmentError::invalid_input(format!("no precomputed score for {stem}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_by_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, r#"{"MAT_001_001": -0.1, "MAT_001_002": -0.35}"#).unwrap();
        let scorer = PrecomputedScorer::from_json_file(&path).unwrap();
        assert_eq!(scorer.len(), 2);
        assert_eq!(
            scorer
                .score(Path::new("x/MAT/MAT_001/MAT_001_002.wav"), "")
                .unwrap(),
            -0.35
        );
        assert!(scorer.score(Path::new("MAT_009_001.wav"), "").is_err());
    }

    #[test]
    fn batch_preserves_order() {
        let scorer = PrecomputedScorer::new(HashMap::from([
            ("a".to_string(), 1.0),
            ("b".to_string(), 2.0),
        ]));
        let items = vec![
            ("b.wav".into(), String::new()),
            ("zz.wav".into(), String::new()),
            ("a.wav".into(), String::new()),
        ];
        let scores = scorer.score_batch(&items);
        assert_eq!(scores[0].as_ref().unwrap(), &2.0);
        assert!(scores[1].is_err());
        assert_eq!(scores[2].as_ref().unwrap(), &1.0);
    }
}
