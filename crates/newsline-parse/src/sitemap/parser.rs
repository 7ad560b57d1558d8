//! Sitemap parser using quick-xml
//!
//! Streaming, namespace-aware parser for `urlset` and `sitemapindex`
//! documents with the news and xhtml link extensions, plus plain-text URL
//! lists. Elements outside the accepted namespaces are skipped.

use std::borrow::Cow;
use std::fmt;
use std::io::Read;

use flate2::read::GzDecoder;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use url::Url;

use super::date::parse_w3c_datetime;
use super::model::{
    AlternateLink, ChangeFrequency, NewsAttributes, ParsedSitemap, SitemapEntry, SitemapKind,
};
use super::namespace::NsKind;

type XmlReader<'a> = NsReader<&'a [u8]>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on decompressed content (the protocol limit for one sitemap)
const MAX_DECOMPRESSED_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug)]
pub enum ParseError {
    Empty,
    Gzip(std::io::Error),
    /// Root element is neither `urlset` nor `sitemapindex` in an accepted namespace
    UnknownFormat(String),
    Xml(quick_xml::Error),
    /// Document ended inside an open element
    Truncated,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty sitemap"),
            Self::Gzip(e) => write!(f, "failed to decompress gzip content: {e}"),
            Self::UnknownFormat(root) => {
                write!(f, "unknown sitemap format: root element <{root}>")
            }
            Self::Xml(e) => write!(f, "malformed XML: {e}"),
            Self::Truncated => write!(f, "unexpected end of document"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gzip(e) => Some(e),
            Self::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

/// Decompress gzip content; anything else is returned as is.
pub fn decode_content(content: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    if !content.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(content));
    }
    let mut out = Vec::new();
    GzDecoder::new(content)
        .take(MAX_DECOMPRESSED_SIZE)
        .read_to_end(&mut out)
        .map_err(ParseError::Gzip)?;
    Ok(Cow::Owned(out))
}

/// At most `limit` bytes of the content, decompressing only as much gzip
/// input as that prefix needs.
pub fn content_prefix(content: &[u8], limit: usize) -> Cow<'_, [u8]> {
    if !content.starts_with(&GZIP_MAGIC) {
        return Cow::Borrowed(&content[..content.len().min(limit)]);
    }
    let mut out = Vec::new();
    if let Err(e) = GzDecoder::new(content)
        .take(limit as u64)
        .read_to_end(&mut out)
    {
        log::debug!("Gzip content undecodable after {} bytes: {e}", out.len());
    }
    Cow::Owned(out)
}

fn looks_like_xml(content: &[u8]) -> bool {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    content
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
}

fn resolved_kind(res: &ResolveResult) -> NsKind {
    match res {
        ResolveResult::Bound(Namespace(ns)) => NsKind::of(Some(*ns)),
        ResolveResult::Unbound => NsKind::of(None),
        ResolveResult::Unknown(_) => NsKind::Other,
    }
}

#[derive(Debug, Clone)]
pub struct SitemapParser {
    allow_partial: bool,
}

impl Default for SitemapParser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SitemapParser {
    /// With `allow_partial`, an XML error after the root element was
    /// recognised keeps the entries read so far.
    pub fn new(allow_partial: bool) -> Self {
        Self { allow_partial }
    }

    /// Parse XML, gzipped XML or a plain-text URL list.
    ///
    /// `text/plain` content, or content that does not start with markup, is
    /// read as one URL per line.
    pub fn parse(
        &self,
        url: &str,
        content: &[u8],
        content_type: Option<&str>,
    ) -> Result<ParsedSitemap, ParseError> {
        let content = decode_content(content)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::Empty);
        }
        let plain_text = content_type.is_some_and(|ct| ct.contains("text/plain"));
        if plain_text || !looks_like_xml(&content) {
            return Ok(parse_text(url, &content));
        }
        self.parse_xml(url, &content)
    }

    fn parse_xml(&self, url: &str, content: &[u8]) -> Result<ParsedSitemap, ParseError> {
        let mut reader = NsReader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let (kind, is_empty) = loop {
            match reader.read_resolved_event_into(&mut buf)? {
                (res, Event::Start(e)) => break (root_kind(&res, &e)?, false),
                (res, Event::Empty(e)) => break (root_kind(&res, &e)?, true),
                (_, Event::Eof) => return Err(ParseError::Empty),
                _ => {}
            }
            buf.clear();
        };

        let mut sitemap = ParsedSitemap::new(kind);
        if is_empty {
            return Ok(sitemap);
        }

        let entry_tag: &[u8] = match kind {
            SitemapKind::UrlSet => b"url",
            SitemapKind::Index => b"sitemap",
        };
        match parse_entries(&mut reader, entry_tag, &mut sitemap.entries) {
            Ok(()) => Ok(sitemap),
            Err(e) if self.allow_partial => {
                log::warn!(
                    "{url}: partial sitemap, keeping {} entries read before error: {e}",
                    sitemap.entries.len()
                );
                sitemap.partial = true;
                Ok(sitemap)
            }
            Err(e) => Err(e),
        }
    }
}

fn root_kind(res: &ResolveResult, root: &BytesStart) -> Result<SitemapKind, ParseError> {
    match (resolved_kind(res), root.local_name().as_ref()) {
        (NsKind::Sitemap, b"urlset") => Ok(SitemapKind::UrlSet),
        (NsKind::Sitemap, b"sitemapindex") => Ok(SitemapKind::Index),
        (_, other) => Err(ParseError::UnknownFormat(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Children of the root element until its end tag
fn parse_entries(
    reader: &mut XmlReader,
    entry_tag: &[u8],
    entries: &mut Vec<SitemapEntry>,
) -> Result<(), ParseError> {
    let mut buf = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (res, Event::Start(e)) => {
                if resolved_kind(&res) == NsKind::Sitemap && e.local_name().as_ref() == entry_tag {
                    if let Some(entry) = parse_entry(reader)? {
                        entries.push(entry);
                    }
                } else {
                    skip_element(reader)?;
                }
            }
            (_, Event::End(_)) => break,
            (_, Event::Eof) => return Err(ParseError::Truncated),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Parse one `<url>` or `<sitemap>`; `None` if `loc` is missing or invalid
fn parse_entry(reader: &mut XmlReader) -> Result<Option<SitemapEntry>, ParseError> {
    let mut buf = Vec::new();
    let mut loc = None;
    let mut last_modified = None;
    let mut priority = None;
    let mut change_frequency = None;
    let mut news = Vec::new();
    let mut alternates = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (res, Event::Start(e)) => {
                let kind = resolved_kind(&res);
                match (kind, e.local_name().as_ref()) {
                    (NsKind::Sitemap, b"loc") => loc = Some(read_text(reader)?),
                    (NsKind::Sitemap, b"lastmod") => {
                        last_modified = parse_w3c_datetime(&read_text(reader)?);
                    }
                    (NsKind::Sitemap, b"priority") => {
                        priority = parse_priority(&read_text(reader)?);
                    }
                    (NsKind::Sitemap, b"changefreq") => {
                        change_frequency = ChangeFrequency::parse(&read_text(reader)?);
                    }
                    (NsKind::News, b"news") => news.push(parse_news(reader)?),
                    (NsKind::Links, b"link") => {
                        alternates.extend(alternate_link(&e)?);
                        skip_element(reader)?;
                    }
                    _ => skip_element(reader)?,
                }
            }
            (res, Event::Empty(e)) => {
                if resolved_kind(&res) == NsKind::Links && e.local_name().as_ref() == b"link" {
                    alternates.extend(alternate_link(&e)?);
                }
            }
            (_, Event::End(_)) => break,
            (_, Event::Eof) => return Err(ParseError::Truncated),
            _ => {}
        }
        buf.clear();
    }

    let Some(loc) = loc else {
        log::debug!("Skipping sitemap entry without <loc>");
        return Ok(None);
    };
    let loc = match Url::parse(&loc) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("Skipping sitemap entry with invalid URL {loc:?}: {e}");
            return Ok(None);
        }
    };

    Ok(Some(SitemapEntry {
        loc,
        last_modified,
        priority,
        change_frequency,
        news,
        alternates,
    }))
}

fn parse_news(reader: &mut XmlReader) -> Result<NewsAttributes, ParseError> {
    let mut buf = Vec::new();
    let mut news = NewsAttributes::default();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (res, Event::Start(e)) => {
                let kind = resolved_kind(&res);
                match (kind, e.local_name().as_ref()) {
                    (NsKind::News, b"publication_date") => {
                        news.publication_date = parse_w3c_datetime(&read_text(reader)?);
                    }
                    (NsKind::News, b"title") => {
                        let title = read_text(reader)?;
                        news.title = (!title.is_empty()).then_some(title);
                    }
                    // <news:publication>, <news:keywords>, ...
                    _ => skip_element(reader)?,
                }
            }
            (_, Event::End(_)) => break,
            (_, Event::Eof) => return Err(ParseError::Truncated),
            _ => {}
        }
        buf.clear();
    }

    Ok(news)
}

/// `rel="alternate"` links with an absolute `href`
fn alternate_link(e: &BytesStart) -> Result<Option<AlternateLink>, ParseError> {
    let mut rel = None;
    let mut hreflang = None;
    let mut href = None;

    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"rel" => rel = Some(value),
            b"hreflang" => hreflang = Some(value),
            b"href" => href = Some(value),
            _ => {}
        }
    }

    if !rel.is_some_and(|r| r.eq_ignore_ascii_case("alternate")) {
        return Ok(None);
    }
    Ok(href
        .and_then(|h| Url::parse(h.trim()).ok())
        .map(|href| AlternateLink { hreflang, href }))
}

fn parse_priority(value: &str) -> Option<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|p| (0.0..=1.0).contains(p))
}

/// Text content up to the end of the current element, CDATA and the text of
/// nested elements included
fn read_text(reader: &mut XmlReader) -> Result<String, ParseError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

fn skip_element(reader: &mut XmlReader) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(ParseError::Truncated),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// One absolute http(s) URL per line; anything else is ignored
fn parse_text(url: &str, content: &[u8]) -> ParsedSitemap {
    let mut sitemap = ParsedSitemap::new(SitemapKind::UrlSet);
    let text = String::from_utf8_lossy(content);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match Url::parse(line) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {
                sitemap.entries.push(SitemapEntry::new(u));
            }
            _ => log::debug!("{url}: ignoring line in text sitemap: {line:?}"),
        }
    }
    sitemap
}
