//! EXI events to XML text.
//!
//! Namespace-bewusster Serializer: verwendet erhaltene Prefixe und
//! NS-Events, wenn vorhanden (`Preserve.prefixes`), und erfindet sonst
//! minimale Deklarationen (Default-Namespace für Elemente, generierte
//! Prefixe für Attribute in Namespaces).

use std::io::Write;

use crate::event::{ExiEvent, NsContent};
use crate::qname::QName;
use crate::{Error, Result};

/// Serializes events into an XML string.
pub fn events_to_xml(events: &[ExiEvent]) -> Result<String> {
    let mut out = Vec::new();
    events_to_xml_writer(events, &mut out)?;
    String::from_utf8(out).map_err(|e| Error::unexpected(format!("serializer utf-8: {e}")))
}

/// Serializes events into a writer.
pub fn events_to_xml_writer(events: &[ExiEvent], out: &mut impl Write) -> Result<()> {
    let mut ser = Serializer::new(out);
    for event in events {
        ser.event(event)?;
    }
    ser.finish()
}

struct Serializer<'w, W: Write> {
    out: &'w mut W,
    /// Offener Start-Tag wartet auf AT/NS oder Content.
    tag_open: bool,
    /// Serialisierte Tag-Namen der offenen Elemente.
    open_elements: Vec<String>,
    /// Ein Namespace-Scope pro offenem Element: (prefix, uri).
    scopes: Vec<Vec<(String, String)>>,
    /// NS-Events vor dem zugehörigen SE.
    pending_ns: Vec<NsContent>,
    /// Zähler für generierte Prefixe.
    gen_counter: usize,
}

impl<'w, W: Write> Serializer<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self {
            out,
            tag_open: false,
            open_elements: Vec::new(),
            scopes: Vec::new(),
            pending_ns: Vec::new(),
            gen_counter: 0,
        }
    }

    fn event(&mut self, event: &ExiEvent) -> Result<()> {
        match event {
            ExiEvent::StartDocument | ExiEvent::EndDocument => Ok(()),
            ExiEvent::NamespaceDeclaration(ns) => {
                self.pending_ns.push(ns.clone());
                Ok(())
            }
            ExiEvent::StartElement(q) => self.start_element(q),
            ExiEvent::Attribute(at) => self.attribute(&at.qname, &at.value),
            ExiEvent::Characters(ch) => {
                self.close_tag()?;
                self.write_escaped_text(&ch.value)
            }
            ExiEvent::EndElement => self.end_element(),
            ExiEvent::Comment(cm) => {
                self.close_tag()?;
                write!(self.out, "<!--{}-->", cm.text).map_err(io_err)
            }
            ExiEvent::ProcessingInstruction(pi) => {
                self.close_tag()?;
                if pi.data.is_empty() {
                    write!(self.out, "<?{}?>", pi.target).map_err(io_err)
                } else {
                    write!(self.out, "<?{} {}?>", pi.target, pi.data).map_err(io_err)
                }
            }
            ExiEvent::DocType(dt) => {
                write!(self.out, "<!DOCTYPE {}", dt.name).map_err(io_err)?;
                if !dt.public.is_empty() {
                    write!(self.out, " PUBLIC \"{}\" \"{}\"", dt.public, dt.system)
                        .map_err(io_err)?;
                } else if !dt.system.is_empty() {
                    write!(self.out, " SYSTEM \"{}\"", dt.system).map_err(io_err)?;
                }
                if !dt.text.is_empty() {
                    write!(self.out, " [{}]", dt.text).map_err(io_err)?;
                }
                write!(self.out, ">").map_err(io_err)
            }
            ExiEvent::EntityReference(er) => {
                self.close_tag()?;
                write!(self.out, "&{};", er.name).map_err(io_err)
            }
            ExiEvent::SelfContained => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if !self.open_elements.is_empty() {
            return Err(Error::proc_state("all elements closed", "open element"));
        }
        Ok(())
    }

    /// Schließt einen offenen Start-Tag mit `>`.
    fn close_tag(&mut self) -> Result<()> {
        if self.tag_open {
            write!(self.out, ">").map_err(io_err)?;
            self.tag_open = false;
        }
        Ok(())
    }

    /// Innerste Bindung eines Prefixes.
    fn lookup_prefix(&self, prefix: &str) -> Option<&str> {
        for scope in self.scopes.iter().rev() {
            for (p, uri) in scope.iter().rev() {
                if p == prefix {
                    return Some(uri);
                }
            }
        }
        None
    }

    /// Ein Prefix, der auf die URI zeigt (Default-Namespace nur wenn
    /// `allow_default`, Attribute brauchen echte Prefixe).
    fn prefix_for_uri(&self, uri: &str, allow_default: bool) -> Option<String> {
        for scope in self.scopes.iter().rev() {
            for (p, u) in scope.iter().rev() {
                if u == uri && (allow_default || !p.is_empty()) {
                    // Bindung darf nicht von innen überschattet sein
                    if self.lookup_prefix(p) == Some(uri) {
                        return Some(p.clone());
                    }
                }
            }
        }
        None
    }

    fn start_element(&mut self, q: &QName) -> Result<()> {
        self.close_tag()?;

        // Scope mit den explizit gelieferten NS-Events beginnen
        let mut scope: Vec<(String, String)> = Vec::new();
        let mut declared: Vec<(String, String)> = Vec::new();
        for ns in self.pending_ns.drain(..) {
            scope.push((ns.prefix.to_string(), ns.uri.to_string()));
            declared.push((ns.prefix.to_string(), ns.uri.to_string()));
        }
        self.scopes.push(scope);

        // Tag-Namen bestimmen; ggf. zusätzliche Deklaration erfinden
        let tag = match q.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:{}", q.local_name),
            _ => {
                if q.uri.is_empty() {
                    // Aktiven Default-Namespace ggf. aufheben
                    if self.lookup_prefix("").is_some_and(|u| !u.is_empty()) {
                        declared.push((String::new(), String::new()));
                        self.scopes
                            .last_mut()
                            .expect("scope pushed above")
                            .push((String::new(), String::new()));
                    }
                    q.local_name.to_string()
                } else if self.lookup_prefix("").is_some_and(|u| *u == *q.uri) {
                    q.local_name.to_string()
                } else if let Some(p) = self.prefix_for_uri(&q.uri, false) {
                    format!("{p}:{}", q.local_name)
                } else {
                    // Default-Namespace auf diesem Element deklarieren
                    declared.push((String::new(), q.uri.to_string()));
                    self.scopes
                        .last_mut()
                        .expect("scope pushed above")
                        .push((String::new(), q.uri.to_string()));
                    q.local_name.to_string()
                }
            }
        };

        write!(self.out, "<{tag}").map_err(io_err)?;
        for (prefix, uri) in declared {
            if prefix.is_empty() {
                write!(self.out, " xmlns=\"")?;
            } else {
                write!(self.out, " xmlns:{prefix}=\"")?;
            }
            self.write_escaped_attr(&uri)?;
            write!(self.out, "\"")?;
        }
        self.tag_open = true;
        self.open_elements.push(tag);
        Ok(())
    }

    fn attribute(&mut self, q: &QName, value: &str) -> Result<()> {
        if !self.tag_open {
            return Err(Error::proc_state("open start tag for attribute", "AT"));
        }
        let name = match q.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:{}", q.local_name),
            _ if q.uri.is_empty() => q.local_name.to_string(),
            _ => match self.prefix_for_uri(&q.uri, false) {
                Some(p) => format!("{p}:{}", q.local_name),
                None => {
                    // Prefix erfinden und auf diesem Element deklarieren
                    self.gen_counter += 1;
                    let p = format!("n{}", self.gen_counter);
                    write!(self.out, " xmlns:{p}=\"")?;
                    self.write_escaped_attr(&q.uri)?;
                    write!(self.out, "\"")?;
                    self.scopes
                        .last_mut()
                        .ok_or_else(|| Error::proc_state("element scope", "missing"))?
                        .push((p.clone(), q.uri.to_string()));
                    format!("{p}:{}", q.local_name)
                }
            },
        };
        write!(self.out, " {name}=\"").map_err(io_err)?;
        self.write_escaped_attr(value)?;
        write!(self.out, "\"").map_err(io_err)
    }

    fn end_element(&mut self) -> Result<()> {
        let tag = self
            .open_elements
            .pop()
            .ok_or_else(|| Error::proc_state("open element for EE", "EE"))?;
        self.scopes.pop();
        if self.tag_open {
            self.tag_open = false;
            write!(self.out, "/>").map_err(io_err)
        } else {
            write!(self.out, "</{tag}>").map_err(io_err)
        }
    }

    fn write_escaped_text(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            match ch {
                '&' => write!(self.out, "&amp;")?,
                '<' => write!(self.out, "&lt;")?,
                '>' => write!(self.out, "&gt;")?,
                c => write!(self.out, "{c}")?,
            }
        }
        Ok(())
    }

    fn write_escaped_attr(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            match ch {
                '&' => write!(self.out, "&amp;")?,
                '<' => write!(self.out, "&lt;")?,
                '"' => write!(self.out, "&quot;")?,
                c => write!(self.out, "{c}")?,
            }
        }
        Ok(())
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::unexpected(format!("serializer write: {e}"))
}
