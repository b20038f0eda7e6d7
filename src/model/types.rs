/// Internal numeric IDs (indexes into the annotation index Vecs).
pub type ExonId = usize;
pub type TranscriptId = usize;
