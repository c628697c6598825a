// CLI module for argument parsing and configuration

use clap::{ArgAction, Parser};
use std::env;
use std::path::{Component, Path, PathBuf};

/// DropShelf - a temporary shelf for files on their way somewhere else
///
/// Stage the given files, then copy them into a destination folder (sorted
/// into one subfolder per file type by default) or print their paths.
#[derive(Parser, Debug, Clone)]
#[command(name = "dropshelf")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Files to stage
    pub files: Vec<PathBuf>,

    /// Destination folder for the move
    ///
    /// If not specified, the default destination from the settings is used.
    #[arg(short = 't', long = "to")]
    pub destination: Option<PathBuf>,

    /// Print the staged paths instead of moving the files
    #[arg(short = 'p', long = "print-paths", action = ArgAction::SetTrue)]
    pub print_paths: bool,

    /// Select staged files by position (1-based) before dispatching
    ///
    /// Can be repeated or comma-separated (--select 1,3). Without a
    /// selection every staged file is dispatched.
    #[arg(short = 's', long = "select", action = ArgAction::Append, value_delimiter = ',')]
    pub select: Vec<usize>,

    /// Show the staged files grouped by category
    ///
    /// Unless --to or --print-paths is also given, nothing is moved.
    #[arg(short = 'l', long = "list", action = ArgAction::SetTrue)]
    pub list: bool,

    /// Print the recently used destinations
    #[arg(long = "recent", action = ArgAction::SetTrue)]
    pub show_recent: bool,

    /// Forget the recently used destinations
    #[arg(long = "forget-recent", action = ArgAction::SetTrue)]
    pub forget_recent: bool,

    /// Settings file to use instead of the default one
    #[arg(long = "settings")]
    pub settings: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

/// What happens to the stack once the files are staged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Copy the stack into the destination folder
    #[default]
    Move,
    /// Hand the stack's paths to the clipboard sink
    PrintPaths,
    /// Leave the stack alone
    None,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate the arguments
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref destination) = self.destination {
            if destination.is_file() {
                return Err(format!(
                    "Destination is a file, not a folder: {}",
                    destination.display()
                ));
            }
        }

        if self.select.contains(&0) {
            return Err("Selection positions start at 1".to_string());
        }

        if self.print_paths && self.destination.is_some() {
            return Err("--print-paths and --to cannot be combined".to_string());
        }

        Ok(())
    }

    pub fn dispatch(&self) -> Dispatch {
        if self.print_paths {
            Dispatch::PrintPaths
        } else if self.files.is_empty() || (self.list && self.destination.is_none()) {
            Dispatch::None
        } else {
            Dispatch::Move
        }
    }
}

/// Anchors a relative `path` at `cwd` and drops `.` components, so one file
/// is always staged under one spelling.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub files: Vec<PathBuf>,
    pub destination: Option<PathBuf>,
    pub dispatch: Dispatch,
    /// Zero-based stack positions to select
    pub select: Vec<usize>,
    pub list: bool,
    pub show_recent: bool,
    pub forget_recent: bool,
    pub settings: Option<PathBuf>,
    pub verbose: bool,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let dispatch = args.dispatch();
        // Without a working directory the paths are passed through as given
        let anchor = |path: PathBuf| match env::current_dir() {
            Ok(cwd) => absolutize(&path, &cwd),
            Err(_) => path,
        };
        AppConfig {
            files: args.files.into_iter().map(anchor).collect(),
            destination: args.destination.map(anchor),
            dispatch,
            select: args.select.iter().map(|n| n.saturating_sub(1)).collect(),
            list: args.list,
            show_recent: args.show_recent,
            forget_recent: args.forget_recent,
            settings: args.settings,
            verbose: args.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dropshelf").chain(argv.iter().copied())).unwrap()
    }

    mod args_tests {
        use super::*;

        #[test]
        fn test_args_default_values() {
            let args = parse(&[]);

            assert!(args.files.is_empty());
            assert!(args.destination.is_none());
            assert!(!args.print_paths);
            assert!(args.select.is_empty());
            assert!(!args.list);
            assert!(!args.verbose);
            assert_eq!(args.dispatch(), Dispatch::None);
        }

        #[test]
        fn test_args_files_and_destination() {
            let args = parse(&["a.png", "b.pdf", "--to", "/tmp/out"]);

            assert_eq!(
                args.files,
                vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]
            );
            assert_eq!(args.destination, Some(PathBuf::from("/tmp/out")));
            assert_eq!(args.dispatch(), Dispatch::Move);
        }

        #[test]
        fn test_args_select_multiple() {
            let args = parse(&["a", "b", "c", "--select", "1", "--select", "3", "--print-paths"]);

            assert_eq!(args.select, vec![1, 3]);
            assert_eq!(args.dispatch(), Dispatch::PrintPaths);
        }

        #[test]
        fn test_args_select_comma_separated() {
            let args = parse(&["a", "b", "c", "--select", "1,3"]);
            assert_eq!(args.select, vec![1, 3]);
        }

        #[test]
        fn test_args_select_before_files() {
            let args = parse(&["--select", "1", "a.png", "b.pdf"]);

            assert_eq!(args.select, vec![1]);
            assert_eq!(
                args.files,
                vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]
            );
        }

        #[test]
        fn test_list_without_destination_does_not_move() {
            assert_eq!(parse(&["a", "--list"]).dispatch(), Dispatch::None);
            assert_eq!(
                parse(&["a", "--list", "--to", "/x"]).dispatch(),
                Dispatch::Move
            );
        }

        #[test]
        fn test_args_validate_destination_is_file() {
            let temp_dir = TempDir::new().unwrap();
            let file = temp_dir.path().join("f.txt");
            std::fs::write(&file, b"x").unwrap();
            let mut args = parse(&["a"]);
            args.destination = Some(file);

            let result = args.validate();
            assert!(result.is_err());
            assert!(result.unwrap_err().contains("is a file"));
        }

        #[test]
        fn test_args_validate_missing_destination_is_ok() {
            let args = parse(&["a", "--to", "/nonexistent/dropshelf/out"]);
            assert!(args.validate().is_ok());
        }

        #[test]
        fn test_args_validate_zero_selection() {
            let args = parse(&["a", "--select", "0"]);

            let result = args.validate();
            assert!(result.is_err());
            assert!(result.unwrap_err().contains("start at 1"));
        }

        #[test]
        fn test_args_validate_print_paths_with_destination() {
            let args = parse(&["a", "--print-paths", "--to", "/x"]);
            assert!(args.validate().is_err());
        }
    }

    mod app_config_tests {
        use super::*;

        #[test]
        fn test_app_config_from_args() {
            let args = parse(&["a", "b", "--select", "2", "--verbose", "--recent"]);
            let config: AppConfig = args.into();

            assert_eq!(config.files.len(), 2);
            assert_eq!(config.select, vec![1]);
            assert_eq!(config.dispatch, Dispatch::Move);
            assert!(config.verbose);
            assert!(config.show_recent);
            assert!(!config.forget_recent);
        }

        #[test]
        fn test_app_config_paths_are_absolute() {
            let args = parse(&["a.png", "./a.png", "sub/../b.pdf", "--to", "out"]);
            let config: AppConfig = args.into();

            assert!(config.files.iter().all(|p| p.is_absolute()));
            assert_eq!(config.files[0], config.files[1]);
            assert!(config.destination.unwrap().is_absolute());
        }

        #[test]
        fn test_absolutize() {
            let cwd = Path::new("/home/me");

            assert_eq!(absolutize(Path::new("a.png"), cwd), PathBuf::from("/home/me/a.png"));
            assert_eq!(absolutize(Path::new("./a.png"), cwd), PathBuf::from("/home/me/a.png"));
            assert_eq!(
                absolutize(Path::new("./x/./y.txt"), cwd),
                PathBuf::from("/home/me/x/y.txt")
            );
            assert_eq!(absolutize(Path::new("/tmp/a.png"), cwd), PathBuf::from("/tmp/a.png"));
        }

        #[test]
        fn test_app_config_default() {
            let config = AppConfig::default();
            assert!(config.files.is_empty());
            assert_eq!(config.dispatch, Dispatch::Move);
            assert!(config.settings.is_none());
        }
    }
}
