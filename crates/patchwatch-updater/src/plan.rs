//! Patch step plans per OS family

use crate::os::OsFamily;

/// One command in the patch workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Banner text written to the log
    pub label: String,
    /// Program and arguments, executed without a shell
    pub argv: Vec<String>,
}

impl Step {
    pub fn new(label: &str, argv: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            argv: argv.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Command line as written to the log
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Ordered steps for `family`
pub fn plan_for(family: OsFamily) -> Vec<Step> {
    match family {
        OsFamily::Debian => vec![
            Step::new(
                "STEP 1: Update package index (apt-get update)",
                &["apt-get", "update"],
            ),
            Step::new(
                "STEP 2: Apply security patches (unattended-upgrade -d)",
                &["unattended-upgrade", "-d"],
            ),
        ],
        OsFamily::Rhel => vec![
            Step::new(
                "STEP 1: Check for security updates (yum check-update --security)",
                &["yum", "check-update", "--security"],
            ),
            Step::new(
                "STEP 2: Apply security patches (yum update --security -y)",
                &["yum", "update", "--security", "-y"],
            ),
        ],
    }
}
