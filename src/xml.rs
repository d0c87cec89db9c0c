//! XML parsing to EXI events.
//!
//! Baut mit quick-xml eine EXI-Event-Sequenz für den Encoder auf.
//! Namespace-Auflösung läuft über einen eigenen Scope-Stack; `xmlns`-
//! Attribute werden zu NS-Events (nur bei `Preserve.prefixes`) und sind
//! nie gewöhnliche AT-Events. Die Event-Reihenfolge pro Start-Tag ist
//! NS … SE AT … — Encoder und Decoder erwarten genau diese Ordnung.
//! Zeilenenden werden vor dem Tokenizing normalisiert (XML 1.0 Sec. 2.11).

use std::borrow::Cow;
use std::io::BufRead;
use std::rc::Rc;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::event::{
    AtContent, ChContent, CmContent, DtContent, ErContent, ExiEvent, NsContent, PiContent,
};
use crate::options::ExiOptions;
use crate::qname::QName;
use crate::{Error, Result};

/// XML-Namespace-Spec: der `xml`-Prefix ist implizit gebunden.
const XML_PREFIX_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// XML 1.0 Sec. 2.11: `\r\n` → `\n`, alleinstehende `\r` → `\n`.
///
/// quick-xml normalisiert selbst nicht; ohne diesen Schritt überleben
/// CRLF-Zeilenenden als literale `\r` in Text- und Attributwerten.
/// memchr-Fast-Path: Eingaben ohne `\r` bleiben unkopiert.
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if memchr::memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Parses an XML string into EXI events, filtered by the options.
pub fn parse_xml_events_from_str(xml: &str, opts: &ExiOptions) -> Result<Vec<ExiEvent>> {
    // Zeilenenden VOR dem Tokenizing normalisieren (XML 1.0 Sec. 2.11)
    let normalized = normalize_line_endings(xml);
    parse_events(&normalized, opts)
}

/// Parses XML from a reader into EXI events, filtered by the options.
pub fn parse_xml_events_from_reader(
    mut input: impl BufRead,
    opts: &ExiOptions,
) -> Result<Vec<ExiEvent>> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .map_err(|e| Error::unexpected(format!("XML read: {e}")))?;
    parse_xml_events_from_str(&raw, opts)
}

fn parse_events(xml: &str, opts: &ExiOptions) -> Result<Vec<ExiEvent>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().expand_empty_elements = true;
    reader.config_mut().trim_text(false);

    let mut parser = Parser::new(opts);
    let mut events = Vec::new();
    let mut buf = Vec::new();

    events.push(ExiEvent::StartDocument);
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                parser.flush_characters(&mut events)?;
                parser.start_element(e, &mut events)?;
            }
            Ok(Event::End(_)) => {
                parser.flush_characters(&mut events)?;
                parser.depth = parser.depth.saturating_sub(1);
                parser.scopes.pop();
                events.push(ExiEvent::EndElement);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .decode()
                    .map_err(|e| Error::unexpected(format!("XML text: {e}")))?;
                parser.push_characters(&text, false);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8(e.as_ref().to_vec())
                    .map_err(|e| Error::unexpected(format!("XML cdata: {e}")))?;
                // CDATA ist nie insignifikanter Whitespace
                parser.push_characters(&text, true);
            }
            Ok(Event::GeneralRef(ref e)) => {
                // quick-xml spaltet `&name;` aus dem Text heraus; Zeichen-
                // und vordefinierte Referenzen fließen zurück in den
                // CH-Puffer, echte Entities werden zu ER-Events
                // (Preserve.dtd) oder verworfen.
                let name = String::from_utf8(e.as_ref().to_vec())
                    .map_err(|e| Error::unexpected(format!("XML reference: {e}")))?;
                if let Some(ch) = resolve_char_reference(&name) {
                    parser.push_characters(&ch.to_string(), true);
                } else if let Some(resolved) = resolve_predefined_entity(&name) {
                    parser.push_characters(resolved, true);
                } else if opts.preserve.dtd {
                    parser.flush_characters(&mut events)?;
                    events.push(ExiEvent::EntityReference(ErContent {
                        name: name.into(),
                    }));
                } else {
                    log::debug!("dropping unresolvable entity reference &{name};");
                }
            }
            Ok(Event::Comment(ref e)) => {
                if opts.preserve.comments {
                    parser.flush_characters(&mut events)?;
                    let text = String::from_utf8(e.as_ref().to_vec())
                        .map_err(|e| Error::unexpected(format!("XML comment: {e}")))?;
                    events.push(ExiEvent::Comment(CmContent { text: text.into() }));
                }
            }
            Ok(Event::PI(ref e)) => {
                if opts.preserve.pis {
                    parser.flush_characters(&mut events)?;
                    let raw = String::from_utf8(e.as_ref().to_vec())
                        .map_err(|e| Error::unexpected(format!("XML pi: {e}")))?;
                    let (target, data) = match raw.split_once(char::is_whitespace) {
                        Some((t, d)) => (t.to_string(), d.trim_start().to_string()),
                        None => (raw, String::new()),
                    };
                    events.push(ExiEvent::ProcessingInstruction(PiContent {
                        target: target.into(),
                        data: data.into(),
                    }));
                }
            }
            Ok(Event::DocType(ref e)) => {
                if opts.preserve.dtd {
                    let raw = String::from_utf8(e.as_ref().to_vec())
                        .map_err(|e| Error::unexpected(format!("XML doctype: {e}")))?;
                    events.push(ExiEvent::DocType(parse_doctype(&raw)));
                }
            }
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::unexpected(format!("XML parse: {e}"))),
        }
        buf.clear();
    }
    parser.flush_characters(&mut events)?;
    events.push(ExiEvent::EndDocument);
    Ok(events)
}

/// Löst eine Zeichenreferenz `#NN` / `#xNN` auf.
fn resolve_char_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Namespace-Scope-Stack, CH-Koaleszierung und Whitespace-Politik.
struct Parser {
    /// Ein Scope pro offenem Element: neue Bindungen (prefix, uri).
    scopes: Vec<Vec<(String, String)>>,
    depth: usize,
    /// Aufgesammelte Zeichen bis zum nächsten Markup (quick-xml spaltet
    /// Text an Referenzen und CDATA-Grenzen).
    pending_ch: Option<String>,
    /// Der Puffer enthält CDATA/aufgelöste Referenzen und ist damit auch
    /// als reiner Whitespace signifikant.
    pending_significant: bool,
    preserve_prefixes: bool,
    keep_whitespace: bool,
}

impl Parser {
    fn new(opts: &ExiOptions) -> Self {
        Self {
            scopes: Vec::new(),
            depth: 0,
            pending_ch: None,
            pending_significant: false,
            preserve_prefixes: opts.preserve.prefixes,
            keep_whitespace: opts.preserve.keeps_whitespace(),
        }
    }

    /// Sammelt Zeichen; `significant` markiert CDATA/Referenz-Anteile.
    fn push_characters(&mut self, text: &str, significant: bool) {
        if text.is_empty() {
            return;
        }
        self.pending_ch.get_or_insert_with(String::new).push_str(text);
        self.pending_significant |= significant;
    }

    /// Liefert den CH-Puffer als ein Event aus (oder verwirft Whitespace).
    fn flush_characters(&mut self, events: &mut Vec<ExiEvent>) -> Result<()> {
        let Some(text) = self.pending_ch.take() else {
            return Ok(());
        };
        let significant = std::mem::take(&mut self.pending_significant);
        let ws_only = is_whitespace_only(&text);
        if self.depth == 0 {
            if !ws_only {
                return Err(Error::unexpected("character data outside root element"));
            }
            return Ok(());
        }
        if ws_only && !significant && !self.keep_whitespace {
            return Ok(());
        }
        events.push(ExiEvent::Characters(ChContent {
            value: text.into(),
        }));
        Ok(())
    }

    /// Löst einen Prefix über den Scope-Stack auf (innerste Bindung zuerst).
    fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_PREFIX_URI);
        }
        for scope in self.scopes.iter().rev() {
            for (p, uri) in scope.iter().rev() {
                if p == prefix {
                    return Some(uri);
                }
            }
        }
        // Ungebundener leerer Prefix = kein Default-Namespace
        (prefix.is_empty()).then_some("")
    }

    fn start_element(
        &mut self,
        e: &quick_xml::events::BytesStart<'_>,
        events: &mut Vec<ExiEvent>,
    ) -> Result<()> {
        // 1. Pass: Namespace-Bindungen einsammeln
        let mut bindings: Vec<(String, String)> = Vec::new();
        let mut attrs: Vec<(String, String, String)> = Vec::new(); // (prefix, local, value)
        for attr in e.attributes().with_checks(false) {
            let attr = attr.map_err(|e| Error::unexpected(format!("XML attribute: {e}")))?;
            let key = attr.key.as_ref();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::unexpected(format!("XML attribute value: {e}")))?
                .into_owned();
            // Nach dem Unescaping erneut normalisieren: Zeichenreferenzen
            // wie `&#13;` erzeugen `\r`, das der Vorab-Pass nicht sieht
            let value = match normalize_line_endings(&value) {
                Cow::Owned(normalized) => normalized,
                Cow::Borrowed(_) => value,
            };
            let (prefix, local) = split_name(key)?;
            if prefix.is_empty() && local == "xmlns" {
                bindings.push((String::new(), value));
            } else if prefix == "xmlns" {
                bindings.push((local.to_string(), value));
            } else {
                attrs.push((prefix.to_string(), local.to_string(), value));
            }
        }
        self.scopes.push(bindings);
        self.depth += 1;

        // 2. Element-QName auflösen
        let elem_name = e.name();
        let (elem_prefix, elem_local) = split_name(elem_name.as_ref())?;
        let elem_uri = self
            .resolve(elem_prefix)
            .ok_or_else(|| Error::unexpected(format!("unbound prefix '{elem_prefix}'")))?
            .to_string();

        // 3. NS-Events vor dem SE (Reihenfolge NS … SE AT …)
        if self.preserve_prefixes {
            let new_bindings = self.scopes.last().cloned().unwrap_or_default();
            for (prefix, uri) in &new_bindings {
                let local_element_ns = *prefix == elem_prefix && *uri == elem_uri;
                events.push(ExiEvent::NamespaceDeclaration(NsContent {
                    uri: Rc::from(uri.as_str()),
                    prefix: Rc::from(prefix.as_str()),
                    local_element_ns,
                }));
            }
        }

        // 4. SE
        let qname = if self.preserve_prefixes && !elem_prefix.is_empty() {
            QName::with_prefix(elem_uri.as_str(), elem_local, elem_prefix)
        } else {
            QName::new(elem_uri.as_str(), elem_local)
        };
        events.push(ExiEvent::StartElement(Rc::new(qname)));

        // 5. AT-Events; Attribute ohne Prefix haben keinen Namespace
        for (prefix, local, value) in attrs {
            let uri = if prefix.is_empty() {
                ""
            } else {
                self.resolve(&prefix)
                    .ok_or_else(|| Error::unexpected(format!("unbound prefix '{prefix}'")))?
            };
            let qname = if self.preserve_prefixes && !prefix.is_empty() {
                QName::with_prefix(uri, local.as_str(), prefix.as_str())
            } else {
                QName::new(uri, local.as_str())
            };
            events.push(ExiEvent::Attribute(AtContent {
                qname: Rc::new(qname),
                value: value.into(),
            }));
        }
        Ok(())
    }

}

/// Zerlegt `prefix:local` an der ersten `:`; UTF-8-geprüft.
fn split_name(name: &[u8]) -> Result<(&str, &str)> {
    let s = std::str::from_utf8(name)
        .map_err(|e| Error::unexpected(format!("XML name not UTF-8: {e}")))?;
    match memchr::memchr(b':', name) {
        Some(pos) => Ok((&s[..pos], &s[pos + 1..])),
        None => Ok(("", s)),
    }
}

/// XML-Whitespace-Check (Space, Tab, CR, LF) über memchr-Scan.
fn is_whitespace_only(text: &str) -> bool {
    text.bytes()
        .all(|b| memchr::memchr(b, b" \t\r\n").is_some())
}

/// Zerlegt einen DOCTYPE-Rumpf: Name, PUBLIC/SYSTEM-IDs, internes Subset.
fn parse_doctype(raw: &str) -> DtContent {
    let raw = raw.trim();
    let (head, subset) = match raw.find('[') {
        Some(start) => {
            let end = raw.rfind(']').unwrap_or(raw.len());
            (raw[..start].trim(), raw[start + 1..end].trim())
        }
        None => (raw, ""),
    };

    let name_end = head
        .find(char::is_whitespace)
        .unwrap_or(head.len());
    let name = &head[..name_end];
    let rest = head[name_end..].trim_start();

    let mut public = "";
    let mut system = "";
    if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (pub_id, after) = take_quoted(after);
        let (sys_id, _) = take_quoted(after);
        public = pub_id;
        system = sys_id;
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (sys_id, _) = take_quoted(after);
        system = sys_id;
    }

    DtContent {
        name: name.into(),
        public: public.into(),
        system: system.into(),
        text: subset.into(),
    }
}

/// Nächstes `"…"`/`'…'`-Literal; gibt (Inhalt, Rest) zurück.
fn take_quoted(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let Some(quote) = s.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return ("", s);
    };
    let body = &s[1..];
    match body.find(quote) {
        Some(end) => (&body[..end], &body[end + 1..]),
        None => (body, ""),
    }
}
