//! Generalized URL model
//!
//! Locations are plain strings of the form
//! `scheme://[user[:password]@]host[:port]/path[/file][;params][?query][#fragment]`.
//! Whether the segment after `scheme://` is a hostname depends on the transport:
//! `mem://store/dir` names the storage `store`, while `file://dir/file` is a
//! relative path. Every function here therefore takes the transport's
//! `uses_hostname` flag where it matters.

use crate::error::UrlError;

/// Scheme prefixed onto bare paths
pub const DEFAULT_SCHEME: &str = "file";

/// Components of a parsed URL
///
/// Absent groups are empty strings, an absent port is 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
	pub scheme: String,
	pub username: String,
	pub password: String,
	pub hostname: String,
	pub port: u16,
	pub path: String,
	pub file: String,
	pub params: String,
	pub query: String,
	pub fragment: String,
}

impl UrlParts {
	/// True when nothing but (at most) a scheme is present
	pub fn is_bare_scheme(&self) -> bool {
		self.username.is_empty()
			&& self.password.is_empty()
			&& self.hostname.is_empty()
			&& self.port == 0
			&& self.path.is_empty()
			&& self.file.is_empty()
			&& self.params.is_empty()
			&& self.query.is_empty()
			&& self.fragment.is_empty()
	}
}

/// Split a URL into its components
///
/// # Arguments
/// * `raw` - URL text
/// * `uses_hostname` - treat the first segment after `scheme://` as `[user[:pass]@]host[:port]`
/// * `split_filename` - put the last path segment into `file` instead of `path`
pub fn parse(raw: &str, uses_hostname: bool, split_filename: bool) -> Result<UrlParts, UrlError> {
	let (scheme, rest) = split_scheme(raw)?;

	let (main, trailer) = match rest.find(|c: char| c == ';' || c == '?' || c == '#') {
		Some(idx) => (&rest[..idx], &rest[idx..]),
		None => (rest, ""),
	};

	let mut parts = UrlParts { scheme: scheme.to_string(), ..Default::default() };
	split_trailer(trailer, &mut parts);

	let path_part = if uses_hostname {
		let (netloc, path_part) = match main.find('/') {
			Some(idx) => (&main[..idx], &main[idx..]),
			None => (main, ""),
		};
		split_netloc(raw, netloc, &mut parts)?;
		path_part
	} else {
		main
	};

	match path_part.rfind('/') {
		Some(idx) => {
			parts.path = path_part[..=idx].to_string();
			parts.file = path_part[idx + 1..].to_string();
		}
		None => parts.file = path_part.to_string(),
	}

	if !split_filename {
		let file = std::mem::take(&mut parts.file);
		parts.path.push_str(&file);
	}

	Ok(parts)
}

fn split_scheme(raw: &str) -> Result<(&str, &str), UrlError> {
	let idx = match raw.find("://") {
		Some(idx) => idx,
		None => return Ok(("", raw)),
	};
	let candidate = &raw[..idx];

	// "dir/a://b" carries no scheme; the separator is part of the path
	if candidate.contains('/') {
		return Ok(("", raw));
	}
	if candidate.is_empty() || !candidate.chars().all(|c| c.is_alphanumeric() || c == '_') {
		return Err(UrlError::Malformed {
			url: raw.to_string(),
			reason: format!("invalid scheme \"{}\"", candidate),
		});
	}

	Ok((candidate, &raw[idx + 3..]))
}

fn split_trailer(trailer: &str, parts: &mut UrlParts) {
	let mut rest = trailer;

	if let Some(r) = rest.strip_prefix(';') {
		let end = r.find(|c: char| c == '?' || c == '#').unwrap_or(r.len());
		parts.params = r[..end].to_string();
		rest = &r[end..];
	}
	if let Some(r) = rest.strip_prefix('?') {
		let end = r.find('#').unwrap_or(r.len());
		parts.query = r[..end].to_string();
		rest = &r[end..];
	}
	if let Some(r) = rest.strip_prefix('#') {
		parts.fragment = r.to_string();
	}
}

fn split_netloc(raw: &str, netloc: &str, parts: &mut UrlParts) -> Result<(), UrlError> {
	// Hosts never contain '@', so credentials run up to the last one
	let hostport = match netloc.rfind('@') {
		Some(idx) => {
			let userinfo = &netloc[..idx];
			match userinfo.split_once(':') {
				Some((user, pass)) => {
					parts.username = user.to_string();
					parts.password = pass.to_string();
				}
				None => parts.username = userinfo.to_string(),
			}
			&netloc[idx + 1..]
		}
		None => netloc,
	};

	match hostport.rsplit_once(':') {
		Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
			parts.hostname = host.to_string();
			parts.port = port.parse().map_err(|_| UrlError::Malformed {
				url: raw.to_string(),
				reason: format!("port {} out of range", port),
			})?;
		}
		_ => parts.hostname = hostport.to_string(),
	}

	Ok(())
}

/// Reassemble components into a URL
///
/// `compose(&parse(u, ..)?)` gives back `u`. Empty optional segments are left
/// out entirely.
pub fn compose(parts: &UrlParts) -> String {
	let mut url = String::new();

	if !parts.scheme.is_empty() {
		url.push_str(&parts.scheme);
		url.push_str("://");
	}
	url.push_str(&parts.username);
	if !parts.password.is_empty() {
		url.push(':');
		url.push_str(&parts.password);
	}
	if !parts.username.is_empty() || !parts.password.is_empty() {
		url.push('@');
	}
	url.push_str(&parts.hostname);
	if parts.port != 0 {
		url.push(':');
		url.push_str(&parts.port.to_string());
	}
	url.push_str(&parts.path);
	if !parts.file.is_empty() && !parts.hostname.is_empty() && !parts.path.ends_with('/') {
		url.push('/');
	}
	url.push_str(&parts.file);
	if !parts.params.is_empty() {
		url.push(';');
		url.push_str(&parts.params);
	}
	if !parts.query.is_empty() {
		url.push('?');
		url.push_str(&parts.query);
	}
	if !parts.fragment.is_empty() {
		url.push('#');
		url.push_str(&parts.fragment);
	}

	url
}

/// Turn user input into a URL with an explicit scheme
///
/// Backslashes become forward slashes; bare paths get `file://` and have
/// their URL delimiters escaped.
pub fn normalize(raw: &str) -> Result<String, UrlError> {
	let url = raw.replace('\\', "/");
	let parts = parse(&url, true, false)?;

	if parts.scheme.is_empty() {
		Ok(format!("{}://{}", DEFAULT_SCHEME, escape_delimiters(&url)))
	} else {
		Ok(url)
	}
}

fn escape_delimiters(path: &str) -> String {
	let mut escaped = String::with_capacity(path.len());
	for c in path.chars() {
		match c {
			'%' => escaped.push_str("%25"),
			';' => escaped.push_str("%3B"),
			'?' => escaped.push_str("%3F"),
			'#' => escaped.push_str("%23"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Re-root the part of `source_full` below `source_base` onto `destination_base`
///
/// Only the destination's scheme, credentials, host, params, query and
/// fragment survive; those of the source URLs are discarded.
pub fn splice(
	source_base: &str,
	source_full: &str,
	destination_base: &str,
) -> Result<String, UrlError> {
	let base = parse(source_base, true, false)?;
	let full = parse(source_full, true, false)?;
	let mut destination = parse(destination_base, true, false)?;

	let suffix = full.path.strip_prefix(base.path.as_str()).ok_or_else(|| {
		UrlError::NotWithinBase { base: source_base.to_string(), full: source_full.to_string() }
	})?;

	destination.path =
		format!("{}{}", append_slash(&destination.path, true), prepend_slash(suffix, false));

	Ok(compose(&destination))
}

/// Ensure `text` ends with a slash (`want`) or does not
pub fn append_slash(text: &str, want: bool) -> String {
	match (text.strip_suffix('/'), want) {
		(Some(_), true) => text.to_string(),
		(Some(stripped), false) => stripped.to_string(),
		(None, true) => format!("{}/", text),
		(None, false) => text.to_string(),
	}
}

/// Ensure `text` starts with a slash (`want`) or does not
pub fn prepend_slash(text: &str, want: bool) -> String {
	match (text.strip_prefix('/'), want) {
		(Some(_), true) => text.to_string(),
		(Some(stripped), false) => stripped.to_string(),
		(None, true) => format!("/{}", text),
		(None, false) => text.to_string(),
	}
}

/// Scheme of a URL, empty when it has none
pub fn scheme(url: &str) -> Result<String, UrlError> {
	Ok(parse(url, true, false)?.scheme)
}

/// Last path segment of a URL, ignoring a trailing slash
pub fn filename(url: &str, uses_hostname: bool) -> Result<String, UrlError> {
	Ok(parse(&append_slash(url, false), uses_hostname, true)?.file)
}

/// URL of the directory containing `url`
pub fn parent(url: &str, uses_hostname: bool) -> Result<String, UrlError> {
	let mut parts = parse(&append_slash(url, false), uses_hostname, true)?;
	parts.file.clear();
	Ok(compose(&parts))
}

/// True if `candidate` is `base` or lies below it, compared per path component
pub fn is_path_prefix(base: &str, candidate: &str) -> bool {
	let base = append_slash(base, false);
	let candidate = append_slash(candidate, false);
	candidate == base || candidate.starts_with(&format!("{}/", base))
}

/// URL of the entry `name` inside the directory at `url`
///
/// The name is percent-encoded so `;`, `?` and `#` in it stay part of the path.
pub fn child(url: &str, name: &str) -> String {
	format!("{}{}", append_slash(url, true), urlencoding::encode(name))
}

/// Path as the backend stores it, percent escapes resolved
///
/// Malformed escapes are kept literally.
pub fn decode_path(path: &str) -> String {
	match urlencoding::decode(path) {
		Ok(decoded) => decoded.into_owned(),
		Err(_) => path.to_string(),
	}
}


// vim: ts=4
