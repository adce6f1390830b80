use std::collections::BTreeMap;

/// Raw subject spellings grouped under their canonical bucket.
///
/// Covers the senior high school core and track subjects users commonly
/// report, plus the short forms seen in grade profiles.
const SUBJECT_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "mathematics",
        &[
            "math",
            "maths",
            "general mathematics",
            "general math",
            "gen math",
            "pre-calculus",
            "precalculus",
            "pre calculus",
            "basic calculus",
            "calculus",
            "algebra",
            "geometry",
            "trigonometry",
            "statistics and probability",
            "statistics",
            "business mathematics",
            "business math",
        ],
    ),
    (
        "english",
        &[
            "oral communication",
            "oral communication in context",
            "reading and writing",
            "reading and writing skills",
            "english for academic and professional purposes",
            "eapp",
            "creative writing",
            "21st century literature",
            "21st century literature from the philippines and the world",
            "literature",
        ],
    ),
    (
        "filipino",
        &[
            "komunikasyon at pananaliksik",
            "pagbasa at pagsusuri",
            "filipino sa piling larangan",
            "fil",
        ],
    ),
    (
        "science",
        &[
            "general science",
            "earth and life science",
            "earth science",
            "earth and space science",
            "physical science",
            "disaster readiness and risk reduction",
            "drrr",
        ],
    ),
    (
        "biology",
        &[
            "bio",
            "general biology",
            "general biology 1",
            "general biology 2",
            "life science",
        ],
    ),
    (
        "chemistry",
        &[
            "chem",
            "general chemistry",
            "general chemistry 1",
            "general chemistry 2",
        ],
    ),
    (
        "physics",
        &[
            "general physics",
            "general physics 1",
            "general physics 2",
        ],
    ),
    (
        "social studies",
        &[
            "araling panlipunan",
            "ap",
            "social science",
            "history",
            "understanding culture, society and politics",
            "understanding culture society and politics",
            "ucsp",
            "philippine politics and governance",
            "disciplines and ideas in the social sciences",
            "contemporary philippine arts from the regions",
        ],
    ),
    (
        "computer science",
        &[
            "computer",
            "computer programming",
            "programming",
            "ict",
            "information technology",
            "empowerment technologies",
            "empowerment technology",
        ],
    ),
    (
        "accounting",
        &[
            "fundamentals of accountancy",
            "fundamentals of accountancy, business and management",
            "fabm",
            "accountancy",
        ],
    ),
    (
        "economics",
        &["applied economics", "business finance", "econ"],
    ),
    ("arts", &["art", "music", "mapeh", "music and arts"]),
    ("physical education", &["pe", "p.e.", "health", "physical education and health"]),
    (
        "values education",
        &[
            "esp",
            "edukasyon sa pagpapakatao",
            "introduction to the philosophy of the human person",
            "personal development",
        ],
    ),
];

/// Canonicalize a subject name: lower-cased, trimmed, and mapped through
/// the synonym table. Unmapped names pass through after trimming.
pub fn normalize_subject(subject_name: &str) -> String {
    let key = subject_name.trim().to_lowercase();

    for (canonical, aliases) in SUBJECT_SYNONYMS {
        if key == *canonical || aliases.contains(&key.as_str()) {
            return (*canonical).to_string();
        }
    }

    key
}

/// Normalize every key of a grade map.
///
/// Several raw names may collapse onto one canonical subject; their grades
/// are averaged. Blank names and non-finite grades are dropped.
pub fn normalize_grades<'a, I>(grades: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    let mut buckets: BTreeMap<String, (f64, u32)> = BTreeMap::new();

    for (subject, grade) in grades {
        if !grade.is_finite() {
            continue;
        }
        let canonical = normalize_subject(subject);
        if canonical.is_empty() {
            continue;
        }
        let entry = buckets.entry(canonical).or_insert((0.0, 0));
        entry.0 += *grade;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(subject, (sum, count))| (subject, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_synonyms_map_to_canonical() {
        assert_eq!(normalize_subject("Pre-Calculus"), "mathematics");
        assert_eq!(normalize_subject("  General Mathematics "), "mathematics");
        assert_eq!(normalize_subject("General Biology 1"), "biology");
        assert_eq!(normalize_subject("EAPP"), "english");
        assert_eq!(normalize_subject("Empowerment Technologies"), "computer science");
    }

    #[test]
    fn test_canonical_name_is_stable() {
        assert_eq!(normalize_subject("Mathematics"), "mathematics");
        assert_eq!(normalize_subject(&normalize_subject("maths")), "mathematics");
    }

    #[test]
    fn test_unmapped_passes_through() {
        assert_eq!(normalize_subject("  Marine Biology Lab "), "marine biology lab");
    }

    #[test]
    fn test_normalize_grades_averages_collisions() {
        let grades: HashMap<String, f64> = HashMap::from([
            ("General Mathematics".to_string(), 90.0),
            ("Pre-Calculus".to_string(), 80.0),
            ("Physics".to_string(), 88.0),
            ("".to_string(), 99.0),
            ("Chemistry".to_string(), f64::NAN),
        ]);

        let normalized = normalize_grades(&grades);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized["mathematics"], 85.0);
        assert_eq!(normalized["physics"], 88.0);
    }
}
