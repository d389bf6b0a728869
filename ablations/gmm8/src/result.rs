//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Evaluated slices: {}", p.get_evaluated())?;
    writeln!(w, "{S4}Failed slices: {}", p.get_failed())?;
    writeln!(
        w,
        "{S4}Average Jaccard: {}",
        f64_to_display(p.get_avg_jaccard())
    )?;
    match p.get_worst() {
        Some((slice, j)) => {
            let slice = slice.map_or_else(|| "?".to_string(), |s| s.to_string());
            writeln!(w, "{S4}Worst Jaccard: {j:.6} (slice {slice})")?
        }
        None => writeln!(w, "{S4}Worst Jaccard: /")?,
    }
    writeln!(w, "{S4}Evaluation time: {} us", p.get_eval_time_us())?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as u64);
    write!(
        w,
        "{S4}Most time-consuming slice costs {} us",
        t.map_or_else(|| "/".to_string(), |t| t.to_string())
    )?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        utils::sep_to(&mut out)?;
        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut out)?;
            writeln!(out)?;
            utils::sep_to(&mut out)?;
        }
        Ok(())
    }
}
