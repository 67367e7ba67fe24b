use std::collections::{BTreeMap, BTreeSet};

/// One entry of the node-type table: the canonical name used as the
/// bucket key, plus the alternate spellings submitters actually use in
/// file names (hyphenated, pluralized, or historically misspelled).
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeDef {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub const NODE_TYPES: &[NodeTypeDef] = &[
    NodeTypeDef {
        name: "aliquot",
        aliases: &["aliquots"],
    },
    NodeTypeDef {
        name: "assay_result",
        aliases: &["assay-result"],
    },
    NodeTypeDef {
        name: "case",
        aliases: &["cases"],
    },
    NodeTypeDef {
        name: "clinical",
        aliases: &[],
    },
    NodeTypeDef {
        name: "demographic",
        aliases: &["demographics"],
    },
    NodeTypeDef {
        name: "diagnosis",
        aliases: &[],
    },
    NodeTypeDef {
        name: "experiment",
        aliases: &["experiments", "experements"],
    },
    NodeTypeDef {
        name: "experimental_analysis",
        aliases: &[
            "experimental-analysis",
            "experiment-analysis",
            "experiment_analysis",
        ],
    },
    NodeTypeDef {
        name: "experimental_metadata",
        aliases: &[
            "experiment-metadata",
            "experimental-metadata",
            "experiment_metadata",
        ],
    },
    NodeTypeDef {
        name: "experimental_result",
        aliases: &[
            "experimental-result",
            "experiment-result",
            "experiment_result",
        ],
    },
    NodeTypeDef {
        name: "experimental_strategy",
        aliases: &[
            "experimental-strategy",
            "experimental-strategies",
            "experimental_strategies",
        ],
    },
    NodeTypeDef {
        name: "exposure",
        aliases: &["exposures"],
    },
    NodeTypeDef {
        name: "family_history",
        aliases: &["family-history", "family-histories", "family_histories"],
    },
    NodeTypeDef {
        name: "project",
        aliases: &["projects"],
    },
    NodeTypeDef {
        name: "read_group",
        aliases: &["read-group", "read-groups", "read_groups"],
    },
    NodeTypeDef {
        name: "sample",
        aliases: &["samples"],
    },
    NodeTypeDef {
        name: "sample_expectation",
        aliases: &[
            "sample-expectation",
            "sample-expectations",
            "sample_expectations",
        ],
    },
    NodeTypeDef {
        name: "sequencing_files",
        aliases: &[],
    },
    NodeTypeDef {
        name: "slide",
        aliases: &["slides"],
    },
    NodeTypeDef {
        name: "slide_count",
        aliases: &["slide-count", "slide-counts", "slide_counts"],
    },
    NodeTypeDef {
        name: "slide_image",
        aliases: &["slide-image", "slide-images", "slide_images"],
    },
    NodeTypeDef {
        name: "submitted_aligned_reads",
        aliases: &[
            "submitted-aligned-reads",
            "submitted-aligned-read",
            "submitted_aligned_read",
        ],
    },
    NodeTypeDef {
        name: "submitted_copy_number_files",
        aliases: &[
            "submitted-copy-number-files",
            "submitted-copy-number-file",
            "submitted_copy_number_file",
        ],
    },
    NodeTypeDef {
        name: "submitted_somatic_mutations",
        aliases: &[
            "submitted-somatic-mutation",
            "submitted-somatic-mutations",
            "submitted_somatic_mutation",
        ],
    },
    NodeTypeDef {
        name: "submitted_unaligned_reads",
        aliases: &[
            "submitted-unaligned-reads",
            "submitted-unaligned-read",
            "submitted_unaligned_read",
        ],
    },
    NodeTypeDef {
        name: "treatment",
        aliases: &["treatments"],
    },
];

/// Sub-types rolled up into the `clinical` parent bucket.
pub const CLINICAL_SUBTYPES: &[&str] = &[
    "demographic",
    "family_history",
    "exposure",
    "diagnosis",
    "treatment",
];

/// Sub-types rolled up into the `sequencing_files` parent bucket.
pub const SEQUENCING_SUBTYPES: &[&str] = &[
    "submitted_unaligned_reads",
    "submitted_aligned_reads",
    "submitted_somatic_mutations",
    "submitted_copy_number_files",
];

pub const ROLLUP_GROUPS: &[(&str, &[&str])] = &[
    ("clinical", CLINICAL_SUBTYPES),
    ("sequencing_files", SEQUENCING_SUBTYPES),
];

/// Node-type lookup built once at startup. Alias resolution goes
/// through a prebuilt alias -> canonical map instead of scanning every
/// alias list per file.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    canonical: BTreeSet<&'static str>,
    alias_index: BTreeMap<&'static str, &'static str>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::from_defs(NODE_TYPES)
    }

    /// Tie-break rule: when two node types claim the same alias, the
    /// lexicographically first canonical name keeps it.
    pub fn from_defs(defs: &[NodeTypeDef]) -> Self {
        let canonical: BTreeSet<&'static str> = defs.iter().map(|d| d.name).collect();
        let mut by_name: Vec<&NodeTypeDef> = defs.iter().collect();
        by_name.sort_by_key(|d| d.name);

        let mut alias_index: BTreeMap<&'static str, &'static str> = BTreeMap::new();
        for def in by_name {
            for alias in def.aliases {
                if let Some(existing) = alias_index.get(alias) {
                    tracing::warn!(
                        "alias '{}' claimed by both '{}' and '{}'; keeping '{}'",
                        alias,
                        existing,
                        def.name,
                        existing
                    );
                    continue;
                }
                alias_index.insert(alias, def.name);
            }
        }

        NodeRegistry {
            canonical,
            alias_index,
        }
    }

    pub fn canonical_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.canonical.iter().copied()
    }

    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical.contains(name)
    }

    /// Map a storage key to a canonical node-type name, or None when
    /// the file name matches nothing we track.
    ///
    /// Heuristics, in order: keep the last path segment; when the file
    /// name has more than one dot-separated part, drop the first part
    /// (a redundant provider prefix like `umich.case.tsv`); lowercase
    /// and take the token before the first dot; when that token carries
    /// a digit, strip the trailing `_`-delimited segment (an index tail
    /// like `case_007`).
    pub fn normalize_node_name(&self, key: &str) -> Option<&'static str> {
        let mut file_name = key.rsplit('/').next().unwrap_or(key).to_string();
        if file_name.matches('.').count() > 1 {
            if let Some(rest) = file_name.split_once('.') {
                file_name = rest.1.to_string();
            }
        }
        let file_name = file_name.to_lowercase();
        let mut candidate = file_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        if candidate.chars().any(|c| c.is_ascii_digit()) {
            let parts: Vec<&str> = candidate.split('_').collect();
            candidate = parts[..parts.len() - 1].join("_");
        }

        if let Some(name) = self.canonical.get(candidate.as_str()).copied() {
            return Some(name);
        }
        self.alias_index.get(candidate.as_str()).copied()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        NodeRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_exact_canonical_name() {
        let reg = NodeRegistry::new();
        assert_eq!(reg.normalize_node_name("orgX/case.tsv"), Some("case"));
        assert_eq!(reg.normalize_node_name("orgX/sub/aliquot.tsv"), Some("aliquot"));
    }

    #[test]
    fn test_classify_strips_numeric_tail() {
        let reg = NodeRegistry::new();
        assert_eq!(reg.normalize_node_name("orgX/case_007.tsv"), Some("case"));
        assert_eq!(
            reg.normalize_node_name("orgX/read_group_12.tsv"),
            Some("read_group")
        );
    }

    #[test]
    fn test_classify_alias_match() {
        let reg = NodeRegistry::new();
        assert_eq!(
            reg.normalize_node_name("orgX/sample-expectations.tsv"),
            Some("sample_expectation")
        );
        assert_eq!(reg.normalize_node_name("orgX/samples.tsv"), Some("sample"));
        assert_eq!(
            reg.normalize_node_name("orgX/experements.tsv"),
            Some("experiment")
        );
    }

    #[test]
    fn test_classify_drops_provider_prefix() {
        let reg = NodeRegistry::new();
        assert_eq!(
            reg.normalize_node_name("orgX/umich.case.tsv"),
            Some("case")
        );
    }

    #[test]
    fn test_classify_unrecognized() {
        let reg = NodeRegistry::new();
        assert_eq!(reg.normalize_node_name("orgX/unknownthing.tsv"), None);
    }

    #[test]
    fn test_digit_token_without_underscore_becomes_empty() {
        // "sample1" has a digit and no underscore; tail stripping
        // leaves an empty candidate, which matches nothing.
        let reg = NodeRegistry::new();
        assert_eq!(reg.normalize_node_name("orgX/sample1.tsv"), None);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let reg = NodeRegistry::new();
        assert_eq!(reg.normalize_node_name("orgX/Case.TSV"), Some("case"));
    }

    #[test]
    fn test_alias_collision_prefers_lexicographic_canonical() {
        static DEFS: &[NodeTypeDef] = &[
            NodeTypeDef {
                name: "zzz_type",
                aliases: &["shared"],
            },
            NodeTypeDef {
                name: "aaa_type",
                aliases: &["shared"],
            },
        ];
        let reg = NodeRegistry::from_defs(DEFS);
        assert_eq!(reg.normalize_node_name("org/shared.tsv"), Some("aaa_type"));
    }

    #[test]
    fn test_rollup_members_are_registered_node_types() {
        let reg = NodeRegistry::new();
        for (parent, members) in ROLLUP_GROUPS {
            assert!(reg.is_canonical(parent));
            for member in *members {
                assert!(reg.is_canonical(member), "{member} missing from registry");
            }
        }
    }
}
