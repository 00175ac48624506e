//! Skill extraction: a case-insensitive substring scan of free text against a
//! fixed technology vocabulary. No stemming or tokenization; a term is found
//! whenever it occurs anywhere in the lowercased text.

/// Known skill terms, in the order results are reported.
pub const SKILL_VOCABULARY: &[&str] = &[
    "javascript",
    "react",
    "node.js",
    "python",
    "java",
    "solidity",
    "rust",
    "typescript",
    "vue",
    "angular",
    "mongodb",
    "postgresql",
    "mysql",
    "aws",
    "docker",
    "kubernetes",
    "git",
    "blockchain",
    "web3",
    "machine learning",
    "ai",
    "data science",
    "devops",
    "frontend",
    "backend",
    "fullstack",
    "mobile",
    "ios",
    "android",
    "flutter",
    "react native",
    "graphql",
    "rest api",
    "microservices",
    "agile",
    "scrum",
    "ui/ux",
    "design",
    "testing",
    "cypress",
    "jest",
];

/// Returns every vocabulary term that occurs in `text`, deduplicated, in
/// vocabulary order.
pub fn extract_skills(text: &str) -> Vec<&'static str> {
    let haystack = text.to_lowercase();
    let mut found: Vec<&'static str> = Vec::new();
    for &skill in SKILL_VOCABULARY {
        if haystack.contains(skill) && !found.contains(&skill) {
            found.push(skill);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_react_and_solidity() {
        assert_eq!(
            extract_skills("I know React and Solidity"),
            vec!["react", "solidity"]
        );
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(extract_skills("").is_empty());
        assert!(extract_skills("   ").is_empty());
    }

    #[test]
    fn test_substring_semantics_include_overlapping_terms() {
        // "javascript" contains "java"; "react native" contains "react".
        let skills = extract_skills("Senior JavaScript dev, shipped React Native apps");
        assert!(skills.contains(&"javascript"));
        assert!(skills.contains(&"java"));
        assert!(skills.contains(&"react"));
        assert!(skills.contains(&"react native"));
    }

    #[test]
    fn test_multi_word_and_punctuated_terms() {
        let skills = extract_skills("Machine Learning on AWS, REST API design, UI/UX and Node.js");
        for expected in ["machine learning", "aws", "rest api", "design", "ui/ux", "node.js"] {
            assert!(skills.contains(&expected), "missing {expected}: {skills:?}");
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "Rust, Docker, Kubernetes, rust again";
        let first = extract_skills(text);
        let second = extract_skills(text);
        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|s| **s == "rust").count(), 1);

        // Re-extracting from the extracted terms gives the same set back.
        let rejoined = first.join(" ");
        assert_eq!(extract_skills(&rejoined), first);
    }

    #[test]
    fn test_vocabulary_has_no_duplicates() {
        for (i, term) in SKILL_VOCABULARY.iter().enumerate() {
            assert!(
                !SKILL_VOCABULARY[i + 1..].contains(term),
                "duplicate vocabulary term {term}"
            );
        }
    }
}
