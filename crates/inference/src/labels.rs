use anyhow::Context;
use std::path::Path;

pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Fixed id -> name table owned by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Parse one class name per line; line `n` names class id `n`.
    ///
    /// Surrounding whitespace is trimmed. A blank line keeps its slot as an
    /// unnamed class, trailing blank lines are dropped.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let mut names: Vec<String> = contents
            .lines()
            .map(|line| line.trim().to_string())
            .collect();

        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }

        if names.is_empty() {
            anyhow::bail!("Label file contains no class names");
        }

        Ok(Self::new(names))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Load from `path` when given, otherwise fall back to COCO.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::coco()),
        }
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names
            .get(class_id as usize)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_coco_lookup() {
        let labels = LabelTable::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.get(0), Some("person"));
        assert_eq!(labels.get(79), Some("toothbrush"));
        assert_eq!(labels.get(80), None);
    }

    #[test]
    fn test_parse_blank_line_keeps_ids() {
        let labels = LabelTable::parse("person\n\n  helmet  \r\n\n\n").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(0), Some("person"));
        assert_eq!(labels.get(1), None, "Blank line is an unnamed class");
        assert_eq!(labels.get(2), Some("helmet"));
        assert_eq!(labels.get(3), None);
    }

    #[test]
    fn test_parse_rejects_empty_file() {
        assert!(LabelTable::parse("\n \n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "human").unwrap();
        writeln!(file, "vehicle").unwrap();

        let labels = LabelTable::load(file.path().to_str()).unwrap();
        assert_eq!(labels.get(0), Some("human"));
        assert_eq!(labels.get(1), Some("vehicle"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = LabelTable::load(Some("/nonexistent/labels.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/labels.txt"));
    }

    #[test]
    fn test_empty_name_is_unresolved() {
        let labels = LabelTable::new(vec!["person".to_string(), String::new()]);
        assert_eq!(labels.get(1), None);
    }
}
