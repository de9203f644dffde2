use crate::{ErrorCode, ErrorContext, PolyQueryError};

impl From<std::io::Error> for PolyQueryError {
    fn from(err: std::io::Error) -> Self {
        PolyQueryError::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for PolyQueryError {
    fn from(err: serde_json::Error) -> Self {
        PolyQueryError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<serde_yaml::Error> for PolyQueryError {
    fn from(err: serde_yaml::Error) -> Self {
        PolyQueryError::new(ErrorCode::InvalidYaml, err.to_string())
    }
}

impl From<config::ConfigError> for PolyQueryError {
    fn from(err: config::ConfigError) -> Self {
        match &err {
            config::ConfigError::NotFound(field) => PolyQueryError::new(
                ErrorCode::MissingRequiredField,
                format!("Missing configuration value '{}'", field),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: Some(field.clone()),
            }),
            config::ConfigError::FileParse { uri, .. } => {
                PolyQueryError::new(ErrorCode::InvalidYaml, err.to_string()).with_context(
                    ErrorContext::Config {
                        file_path: uri.clone(),
                        field: None,
                    },
                )
            }
            _ => PolyQueryError::new(ErrorCode::ConfigLoadFailed, err.to_string()),
        }
    }
}

impl From<url::ParseError> for PolyQueryError {
    fn from(err: url::ParseError) -> Self {
        PolyQueryError::new(ErrorCode::InvalidConnectionString, err.to_string())
    }
}

/// Return the option closest to `target` by edit distance, if any is within 3 edits.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let target = target.to_lowercase();
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(&target, &option.to_lowercase());
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[a.len()][b.len()]
}
