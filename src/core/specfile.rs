//! RPM spec file editing
//!
//! Bootstrap rebuilds inject `%global` definitions at the top of the spec
//! file and rewrite existing `%define`/`%global` lines to new values before
//! the build runs. Ordinary rebuilds only get a changelog bump.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::recipe::PackageSpec;
use crate::error::BackendError;

/// Find a package's spec file inside its work directory.
///
/// Flat layout (`local`/`custom` downloads) puts `<name>.spec` at the top;
/// git clones nest it under `<name>/`.
pub fn locate_spec(dir: &Path, name: &str) -> Option<PathBuf> {
    let flat = dir.join(format!("{name}.spec"));
    if flat.exists() {
        return Some(flat);
    }
    let nested = dir.join(name).join(format!("{name}.spec"));
    nested.exists().then_some(nested)
}

/// Apply a package's macro overrides to its spec file.
///
/// `macros` entries are injected as new `%global` definitions at the top of
/// the file; `replaced_macros` entries rewrite the value of an existing
/// `%define` or `%global` line, leaving the original whitespace intact.
pub fn apply_overrides(pkg: &PackageSpec, spec_path: &Path) -> Result<(), BackendError> {
    if !pkg.is_bootstrap() {
        return Ok(());
    }

    let mut content = read_spec(pkg, spec_path)?;

    for (name, value) in &pkg.replaced_macros {
        let pattern = format!(
            r"(?m)^%(define|global)(\s+){}(\s+)(\S+)",
            regex::escape(name)
        );
        let re = Regex::new(&pattern).map_err(|e| BackendError::SpecEdit {
            package: pkg.name.clone(),
            error: e.to_string(),
        })?;
        content = re
            .replace_all(&content, format!("%${{1}}${{2}}{name}${{3}}{value}"))
            .into_owned();
    }

    // Inject in reverse so the file ends up in declaration order.
    for (name, value) in pkg.macros.iter().rev() {
        content = format!("%global {name} {value}\n{content}");
    }

    write_spec(pkg, spec_path, &content)
}

/// Record the package's changelog message in the spec file.
///
/// The entry lands directly under the `%changelog` marker; a spec without
/// one gets the section appended.
pub fn bump_changelog(pkg: &PackageSpec, spec_path: &Path, author: &str) -> Result<(), BackendError> {
    let content = read_spec(pkg, spec_path)?;
    let entry = format!("* {} {author}\n- {}\n", rpm_date_now(), pkg.changelog);

    let updated = if let Some(pos) = content.find("%changelog") {
        let line_end = content[pos..]
            .find('\n')
            .map_or(content.len(), |i| pos + i + 1);
        format!("{}{entry}{}", &content[..line_end], &content[line_end..])
    } else {
        format!("{content}\n%changelog\n{entry}")
    };

    write_spec(pkg, spec_path, &updated)
}

fn read_spec(pkg: &PackageSpec, spec_path: &Path) -> Result<String, BackendError> {
    std::fs::read_to_string(spec_path).map_err(|e| BackendError::SpecEdit {
        package: pkg.name.clone(),
        error: format!("{}: {e}", spec_path.display()),
    })
}

fn write_spec(pkg: &PackageSpec, spec_path: &Path, content: &str) -> Result<(), BackendError> {
    std::fs::write(spec_path, content).map_err(|e| BackendError::SpecEdit {
        package: pkg.name.clone(),
        error: format!("{}: {e}", spec_path.display()),
    })
}

/// Current date in RPM changelog format ("Mon Jan 02 2006")
fn rpm_date_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    rpm_date(secs)
}

/// Format a unix timestamp as an RPM changelog date
fn rpm_date(secs: u64) -> String {
    const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let days = (secs / 86_400) as i64;
    let weekday = WEEKDAYS[(days % 7) as usize];

    // Civil-from-days (Howard Hinnant's algorithm).
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!("{weekday} {} {day:02} {year}", MONTHS[(month - 1) as usize])
}
