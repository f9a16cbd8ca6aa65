use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const HANDOFF_PREFIX: &str = "plantcare";

/// File names shared with the external upscaler for one invocation.
///
/// Every invocation gets a fresh UUID stem so concurrent runs never write to
/// or read from each other's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffNames {
    stem: String,
    output_ext: String,
}

impl HandoffNames {
    pub fn fresh(prefix: &str, output_ext: &str) -> Self {
        Self {
            stem: format!("{}_{}", prefix, Uuid::new_v4().simple()),
            output_ext: output_ext.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn input_file_name(&self) -> String {
        format!("{}.png", self.stem)
    }

    /// Name the tool documents for its output: input stem plus `_out`.
    pub fn expected_output(&self) -> String {
        format!("{}_out.{}", self.stem, self.output_ext)
    }

    /// Names seen from other builds of the tool.
    pub fn alternates(&self) -> Vec<String> {
        let expected = self.expected_output();
        [
            format!("{}_out.jpg", self.stem),
            format!("{}.png", self.stem),
            format!("{}.jpg", self.stem),
        ]
        .into_iter()
        .filter(|name| *name != expected)
        .collect()
    }

    pub fn input_path(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(self.input_file_name())
    }

    pub fn expected_output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.expected_output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_follow_the_tool_convention() {
        let names = HandoffNames::fresh(HANDOFF_PREFIX, "png");
        assert!(names.stem().starts_with("plantcare_"));
        assert_eq!(names.input_file_name(), format!("{}.png", names.stem()));
        assert_eq!(names.expected_output(), format!("{}_out.png", names.stem()));
        assert_eq!(
            names.alternates(),
            vec![
                format!("{}_out.jpg", names.stem()),
                format!("{}.png", names.stem()),
                format!("{}.jpg", names.stem()),
            ]
        );
    }

    #[test]
    fn alternates_never_repeat_the_expected_name() {
        let names = HandoffNames::fresh("x", ".JPG");
        assert_eq!(names.expected_output(), format!("{}_out.jpg", names.stem()));
        assert_eq!(names.alternates().len(), 2);
        assert!(!names.alternates().contains(&names.expected_output()));
    }

    #[test]
    fn every_invocation_gets_distinct_file_names() {
        let runs: Vec<HandoffNames> = (0..500)
            .map(|_| HandoffNames::fresh(HANDOFF_PREFIX, "png"))
            .collect();
        let inputs: HashSet<String> = runs.iter().map(|n| n.input_file_name()).collect();
        let outputs: HashSet<String> = runs.iter().map(|n| n.expected_output()).collect();
        assert_eq!(inputs.len(), runs.len());
        assert_eq!(outputs.len(), runs.len());
        assert!(inputs.is_disjoint(&outputs));
    }
}
