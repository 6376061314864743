//! Slash-flag argument surface of the sample driver.
//!
//! The driver keeps the `/key:value` grammar of the sample it migrates:
//! `/url:<collectionUri>` and `/project:<name>` are required, `/type:OM|REST`
//! selects the narration label (both values route to the same unified
//! engine).

use std::fmt;

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub collection_url: String,
    pub project: String,
    pub kind: ClientKind,
}

/// Which client flavor the caller asked for. Kept for command-line
/// compatibility; the object-model flavor is served by the same
/// patch-document engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientKind {
    #[default]
    ObjectModel,
    Rest,
}

impl ClientKind {
    fn parse(value: &str) -> Result<Self, ArgError> {
        match value.to_uppercase().as_str() {
            "OM" => Ok(Self::ObjectModel),
            "REST" => Ok(Self::Rest),
            other => Err(ArgError(format!(
                "unknown client type '{other}' (expected OM or REST)"
            ))),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectModel => f.write_str("OM"),
            Self::Rest => f.write_str("REST"),
        }
    }
}

/// A fatal startup argument error.
#[derive(Debug, PartialEq, Eq)]
pub struct ArgError(String);

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ArgError {}

/// Parse raw arguments into [`Options`].
///
/// # Errors
/// Returns `ArgError` for a malformed argument, an unrecognized flag name,
/// an invalid `/type:` value, or a missing required flag.
pub fn parse(args: &[String]) -> Result<Options, ArgError> {
    let mut collection_url = None;
    let mut project = None;
    let mut kind = ClientKind::default();

    for arg in args {
        let Some((key, value)) = arg.strip_prefix('/').and_then(|a| a.split_once(':')) else {
            return Err(ArgError(format!("unrecognized argument '{arg}'")));
        };

        match key {
            "url" => collection_url = Some(value.to_string()),
            "project" => project = Some(value.to_string()),
            "type" => kind = ClientKind::parse(value)?,
            other => return Err(ArgError(format!("unknown argument '{other}'"))),
        }
    }

    let collection_url =
        collection_url.ok_or_else(|| ArgError("missing required argument /url".to_string()))?;
    let project =
        project.ok_or_else(|| ArgError("missing required argument /project".to_string()))?;

    Ok(Options {
        collection_url,
        project,
        kind,
    })
}

/// Print command-line usage.
pub fn print_usage() {
    println!("Runs the work item tracking samples against a collection.");
    println!();
    println!(
        "The samples show how object-model style operations map onto the \
         stateless patch-document engine."
    );
    println!();
    println!("Arguments:");
    println!();
    println!("  /url:<collectionUri> /project:<projectname> /type:OM|REST");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_all_flags() {
        let options = parse(&strings(&[
            "/url:https://dev.example.com/DefaultCollection",
            "/project:Fabrikam",
            "/type:REST",
        ]))
        .unwrap();

        assert_eq!(options.collection_url, "https://dev.example.com/DefaultCollection");
        assert_eq!(options.project, "Fabrikam");
        assert_eq!(options.kind, ClientKind::Rest);
    }

    #[test]
    fn test_type_defaults_to_object_model() {
        let options = parse(&strings(&["/url:https://x", "/project:P"])).unwrap();
        assert_eq!(options.kind, ClientKind::ObjectModel);
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let options = parse(&strings(&["/url:https://x", "/project:P", "/type:rest"])).unwrap();
        assert_eq!(options.kind, ClientKind::Rest);
    }

    #[test]
    fn test_missing_required_flags() {
        assert!(parse(&strings(&["/url:https://x"])).is_err());
        assert!(parse(&strings(&["/project:P"])).is_err());
    }

    #[test]
    fn test_unknown_flag_is_fatal() {
        let err = parse(&strings(&["/url:https://x", "/project:P", "/verbose:yes"])).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_malformed_argument_is_fatal() {
        assert!(parse(&strings(&["--url=https://x"])).is_err());
        assert!(parse(&strings(&["/url"])).is_err());
    }
}
