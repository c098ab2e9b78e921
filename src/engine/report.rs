//! Counters of one run and the closing summary line

use std::fmt;
use std::time::Duration;

/// What a run did (or, in dry-run mode, would have done)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
	/// Source files compared, copied or not
	pub files_processed: u64,

	pub files_copied: u64,

	/// Destination objects removed, directories included
	pub files_deleted: u64,

	pub dirs_created: u64,

	pub bytes_transferred: u64,

	pub elapsed: Duration,

	pub dry_run: bool,
}

impl SyncReport {
	/// Bytes per second, None when no measurable time passed
	pub fn throughput(&self) -> Option<f64> {
		let seconds = self.elapsed.as_secs_f64();
		if seconds > 0.0 {
			Some(self.bytes_transferred as f64 / seconds)
		} else {
			None
		}
	}

	pub fn summary(&self) -> String {
		let rate = match self.throughput() {
			Some(rate) => group_digits(rate as u64),
			None => "inf".to_string(),
		};
		format!(
			"{}Processed {} files, copied {} ({} bytes), deleted {}, created {} directories in {:.2} sec ({} Bps).",
			if self.dry_run { "[dry run] " } else { "" },
			group_digits(self.files_processed),
			group_digits(self.files_copied),
			group_digits(self.bytes_transferred),
			group_digits(self.files_deleted),
			group_digits(self.dirs_created),
			self.elapsed.as_secs_f64(),
			rate,
		)
	}
}

impl fmt::Display for SyncReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.summary())
	}
}

/// 1234567 -> "1,234,567"
pub fn group_digits(value: u64) -> String {
	let digits = value.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, c) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(c);
	}
	grouped
}


// vim: ts=4
