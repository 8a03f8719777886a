//! Terminal detection

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdin, stdout};

/// Whether stdout is an interactive terminal outside of CI
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    if is_ci_environment() {
        return false;
    }

    if env::var("DEBIAN_FRONTEND").unwrap_or_default() == "noninteractive" {
        return false;
    }

    true
}

/// Whether prompts can be answered
pub fn can_prompt() -> bool {
    stdin().is_terminal() && stderr().is_terminal() && !is_ci_environment()
}

/// Check if the terminal supports ANSI escape codes for colors and progress bars
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    if cfg!(windows) {
        return term != "dumb";
    }

    !(term == "dumb" || term.is_empty())
}

pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TRAVIS",
        "CIRCLECI",
        "BUILDKITE",
        "DRONE",
        "TEAMCITY_VERSION",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}

/// Progress bars go to stderr and need an ANSI capable interactive terminal
pub fn should_show_progress_by_default() -> bool {
    is_interactive() && stderr_is_terminal() && supports_ansi()
}
