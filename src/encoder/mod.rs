//! EXI stream encoder (Spec 5, 6, 8.4).
//!
//! Nimmt eine XML-Event-Sequenz entgegen und schreibt den EXI-Stream.
//! Wählt pro Event die passende Production der aktuellen Regel (gelernter
//! Treffer oder Wildcard-Fallback), schreibt den Event-Code, dann QName
//! und Payload — String-Tabelle und Grammatiken entwickeln sich dabei
//! exakt wie beim Decoder — beide Seiten bleiben im Gleichschritt.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exicore::encoder::encode;
//! use exicore::{ExiEvent, ExiOptions, QName};
//!
//! let events = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "a"))),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let bytes = encode(&events, &ExiOptions::default()).unwrap();
//! assert_eq!(bytes, vec![0x80, 0x40, 0x98, 0x40]);
//! ```

mod qname;
#[cfg(test)]
mod tests;
mod value;

use std::io::Write;

use crate::bitstream::BitWriter;
use crate::event::{ExiEvent, NsContent};
use crate::grammar::{Grammars, Item, Learned, RuleId};
use crate::header::{self, ExiHeader};
use crate::options::{Alignment, ExiOptions};
use crate::string_table::StringTable;
use crate::{n_bit_unsigned_integer, options_codec, string, Error, Result};

/// Encodes a complete event sequence with default header emission.
pub fn encode(events: &[ExiEvent], options: &ExiOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(options.clone(), EncoderConfig::default())?;
    for event in events {
        encoder.encode_event(event)?;
    }
    encoder.finish()
}

/// Header-Emission des Encoders.
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    /// `$EXI`-Cookie schreiben (Spec 5.1).
    pub include_cookie: bool,
    /// Options-Dokument in den Header schreiben; `None` = automatisch,
    /// sobald eine Option vom Default abweicht.
    pub include_options: Option<bool>,
}

/// Dokument-Phase außerhalb von Element-Grammatiken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocPhase {
    BeforeSd,
    DocContent,
    DocEnd,
    FragmentContent,
}

#[derive(Debug)]
struct ElementCtx {
    uri: u32,
    local: u32,
    in_content: bool,
}

/// EXI stream encoder.
#[derive(Debug)]
pub struct Encoder {
    pub(crate) writer: BitWriter,
    pub(crate) options: ExiOptions,
    config: EncoderConfig,
    pub(crate) table: StringTable,
    grammars: Grammars,
    stack: Vec<ElementCtx>,
    phase: DocPhase,
    finished: bool,
    /// NS-Events, die auf ihr SE warten (Event-Reihenfolge: NS vor SE;
    /// Draht-Reihenfolge: SE vor NS, Spec 8.4.3).
    pending_ns: Vec<NsContent>,
}

impl Encoder {
    /// Creates an encoder; validates the option combination (Spec 5.4).
    pub fn new(options: ExiOptions, config: EncoderConfig) -> Result<Self> {
        options.validate()?;
        if options.effective_alignment() == Alignment::PreCompression {
            return Err(Error::NotImplemented(
                "pre-compression and compressed bodies",
            ));
        }
        let table = StringTable::from_options(&options);
        let grammars = Grammars::new(&options);
        Ok(Self {
            writer: BitWriter::new(),
            options,
            config,
            table,
            grammars,
            stack: Vec::with_capacity(16),
            phase: DocPhase::BeforeSd,
            finished: false,
            pending_ns: Vec::new(),
        })
    }

    /// Aktuelle Bit-Position des Ausgabestroms.
    pub fn bit_position(&self) -> usize {
        self.writer.bit_position()
    }

    /// Anzahl gepufferter Ausgabe-Bytes.
    pub fn buf_len(&self) -> usize {
        self.writer.buf_len()
    }

    /// Schreibt vollständige Bytes in den Sink (Streaming zwischen Events).
    pub fn drain_to(&mut self, sink: &mut impl Write) -> Result<()> {
        self.writer
            .drain_to(sink)
            .map_err(|e| Error::unexpected(format!("drain failed: {e}")))
    }

    fn current_rule(&self) -> RuleId {
        if let Some(top) = self.stack.last() {
            if top.in_content {
                RuleId::Content(top.uri, top.local)
            } else {
                RuleId::StartTag(top.uri, top.local)
            }
        } else {
            match self.phase {
                DocPhase::BeforeSd => RuleId::Document,
                DocPhase::DocContent => RuleId::DocContent,
                DocPhase::DocEnd => RuleId::DocEnd,
                DocPhase::FragmentContent => RuleId::FragmentContent,
            }
        }
    }

    fn enter_content(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.in_content = true;
        }
    }

    /// Encodes one event (Spec 6).
    ///
    /// Ein Event, das die aktuelle Regel nicht zulässt, ist
    /// [`Error::InconsistentProcState`].
    pub fn encode_event(&mut self, event: &ExiEvent) -> Result<()> {
        if self.finished {
            return Err(Error::proc_state("no events after ED", event.short_name()));
        }
        if self.phase == DocPhase::BeforeSd && !matches!(event, ExiEvent::StartDocument) {
            return Err(Error::proc_state("SD as first event", event.short_name()));
        }

        match event {
            ExiEvent::StartDocument => self.encode_start_document(),
            ExiEvent::EndDocument => {
                self.require_no_pending_ns("ED")?;
                let rule = self.current_rule();
                self.grammars
                    .write_item(&mut self.writer, rule, Item::EndDocument)?;
                self.finished = true;
                Ok(())
            }
            ExiEvent::StartElement(q) => self.encode_start_element(q),
            ExiEvent::EndElement => {
                self.require_no_pending_ns("EE")?;
                let rule = self.current_rule();
                if self.stack.is_empty() {
                    return Err(Error::proc_state("open element", "EE"));
                }
                if let Some(code) = self.grammars.learned_code(rule, Learned::Ee) {
                    self.grammars.write_learned(&mut self.writer, rule, code);
                } else {
                    self.grammars
                        .write_item(&mut self.writer, rule, Item::EndElement)?;
                }
                self.grammars.learn(rule, Learned::Ee);
                self.stack.pop();
                Ok(())
            }
            ExiEvent::Attribute(at) => self.encode_attribute(&at.qname, &at.value),
            ExiEvent::Characters(ch) => self.encode_characters(&ch.value),
            ExiEvent::NamespaceDeclaration(ns) => {
                if !self.options.preserve.prefixes {
                    // Ohne Preserve.prefixes existiert die NS-Production nicht
                    log::debug!("dropping NS event ({}={})", ns.prefix, ns.uri);
                    return Ok(());
                }
                self.pending_ns.push(ns.clone());
                Ok(())
            }
            ExiEvent::Comment(cm) => {
                if !self.options.preserve.comments {
                    log::debug!("dropping CM event");
                    return Ok(());
                }
                self.require_no_pending_ns("CM")?;
                let rule = self.current_rule();
                self.grammars
                    .write_item(&mut self.writer, rule, Item::Comment)?;
                self.transition_after_child_content(rule);
                string::encode(&mut self.writer, &cm.text);
                Ok(())
            }
            ExiEvent::ProcessingInstruction(pi) => {
                if !self.options.preserve.pis {
                    log::debug!("dropping PI event");
                    return Ok(());
                }
                self.require_no_pending_ns("PI")?;
                let rule = self.current_rule();
                self.grammars
                    .write_item(&mut self.writer, rule, Item::ProcessingInstr)?;
                self.transition_after_child_content(rule);
                string::encode(&mut self.writer, &pi.target);
                string::encode(&mut self.writer, &pi.data);
                Ok(())
            }
            ExiEvent::DocType(dt) => {
                if !self.options.preserve.dtd {
                    log::debug!("dropping DT event");
                    return Ok(());
                }
                let rule = self.current_rule();
                self.grammars
                    .write_item(&mut self.writer, rule, Item::DocType)?;
                string::encode(&mut self.writer, &dt.name);
                string::encode(&mut self.writer, &dt.public);
                string::encode(&mut self.writer, &dt.system);
                string::encode(&mut self.writer, &dt.text);
                Ok(())
            }
            ExiEvent::EntityReference(er) => {
                if !self.options.preserve.dtd {
                    log::debug!("dropping ER event");
                    return Ok(());
                }
                self.require_no_pending_ns("ER")?;
                let rule = self.current_rule();
                self.grammars
                    .write_item(&mut self.writer, rule, Item::EntityRef)?;
                self.transition_after_child_content(rule);
                string::encode(&mut self.writer, &er.name);
                Ok(())
            }
            ExiEvent::SelfContained => Err(Error::NotImplemented("self-contained sub-streams")),
        }
    }

    /// Finalises the stream and returns the encoded bytes.
    ///
    /// [`Error::InconsistentProcState`] wenn kein ED encodiert wurde.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.finished {
            return Err(Error::proc_state("ED before finish", "open stream"));
        }
        Ok(self.writer.into_vec())
    }

    /// Wie [`finish`](Self::finish), schreibt direkt in einen Sink.
    pub fn finish_to(mut self, sink: &mut impl Write) -> Result<()> {
        if !self.finished {
            return Err(Error::proc_state("ED before finish", "open stream"));
        }
        sink.write_all(self.writer.bytes())
            .map_err(|e| Error::unexpected(format!("write failed: {e}")))
    }

    fn encode_start_document(&mut self) -> Result<()> {
        if self.phase != DocPhase::BeforeSd {
            return Err(Error::proc_state("single SD", "repeated SD"));
        }

        let include_options = self
            .config
            .include_options
            .unwrap_or_else(|| self.options.differs_from_default());
        let head = ExiHeader {
            has_cookie: self.config.include_cookie,
            is_preview: false,
            version: 1,
            options_present: include_options,
        };
        header::encode(&mut self.writer, &head, false)?;
        if include_options {
            options_codec::encode(&mut self.writer, &self.options)?;
        }
        if self.options.byte_aligned() {
            self.writer.align_to_byte();
        }

        // SD selbst ist implizit (einzige Production, 0 Bits)
        self.phase = if self.options.fragment {
            DocPhase::FragmentContent
        } else {
            DocPhase::DocContent
        };
        log::debug!(
            "exi header written: options={} cookie={}",
            include_options,
            self.config.include_cookie
        );
        Ok(())
    }

    fn encode_start_element(&mut self, q: &crate::qname::QName) -> Result<()> {
        let rule = self.current_rule();
        if rule == RuleId::Document {
            return Err(Error::proc_state("SD before SE", "SE"));
        }

        // Gelernter Treffer nur, wenn beide IDs schon interniert sind
        let known = self.table.lookup_uri(&q.uri).and_then(|u| {
            self.table
                .lookup_local_name(u, &q.local_name)
                .map(|l| (u as u32, l as u32))
        });
        let (uri, local) = match known
            .and_then(|(u, l)| self.grammars.learned_code(rule, Learned::Se(u, l)).map(|c| (u, l, c)))
        {
            Some((u, l, code)) => {
                self.grammars.write_learned(&mut self.writer, rule, code);
                self.encode_qname_prefix_only(u as usize, q)?;
                (u, l)
            }
            None => {
                self.grammars
                    .write_item(&mut self.writer, rule, Item::StartElementWild)?;
                let (u, l) = self.encode_qname(q)?;
                self.grammars.learn(rule, Learned::Se(u, l));
                (u, l)
            }
        };

        // Übergänge (Spec 8.4): DocContent → DocEnd; StartTag → Content
        match rule {
            RuleId::DocContent => self.phase = DocPhase::DocEnd,
            RuleId::StartTag(..) => self.enter_content(),
            _ => {}
        }
        self.grammars.ensure_element(uri, local);
        self.stack.push(ElementCtx {
            uri,
            local,
            in_content: false,
        });

        // Gepufferte NS-Events gehören in den Start-Tag des neuen Elements
        let pending = std::mem::take(&mut self.pending_ns);
        for ns in &pending {
            let child_rule = self.current_rule();
            self.grammars
                .write_item(&mut self.writer, child_rule, Item::NamespaceDecl)?;
            self.encode_ns_content(ns)?;
        }
        Ok(())
    }

    fn encode_attribute(&mut self, qname: &crate::qname::QName, value: &str) -> Result<()> {
        self.require_no_pending_ns("AT")?;
        let rule = self.current_rule();
        if !matches!(rule, RuleId::StartTag(..)) {
            return Err(Error::proc_state("start tag open for AT", "AT"));
        }

        let known = self.table.lookup_uri(&qname.uri).and_then(|u| {
            self.table
                .lookup_local_name(u, &qname.local_name)
                .map(|l| (u as u32, l as u32))
        });
        let (uri, local) = match known
            .and_then(|(u, l)| self.grammars.learned_code(rule, Learned::At(u, l)).map(|c| (u, l, c)))
        {
            Some((u, l, code)) => {
                self.grammars.write_learned(&mut self.writer, rule, code);
                self.encode_qname_prefix_only(u as usize, qname)?;
                (u, l)
            }
            None => {
                self.grammars
                    .write_item(&mut self.writer, rule, Item::AttributeWild)?;
                let (u, l) = self.encode_qname(qname)?;
                self.grammars.learn(rule, Learned::At(u, l));
                (u, l)
            }
        };
        self.encode_value(uri, local, value)
    }

    fn encode_characters(&mut self, value: &str) -> Result<()> {
        self.require_no_pending_ns("CH")?;
        let rule = self.current_rule();
        let Some(top) = self.stack.last() else {
            return Err(Error::proc_state("open element for CH", "CH"));
        };
        let (uri, local) = (top.uri, top.local);

        if let Some(code) = self.grammars.learned_code(rule, Learned::Ch) {
            self.grammars.write_learned(&mut self.writer, rule, code);
        } else {
            self.grammars
                .write_item(&mut self.writer, rule, Item::Characters)?;
        }
        self.grammars.learn(rule, Learned::Ch);
        self.enter_content();
        self.encode_value(uri, local, value)
    }

    /// Child-Content-Übergang: in Element-Regeln wechselt CM/PI/ER in den
    /// Content-Bereich (Spec 8.4.3); Dokument-Regeln bleiben stehen.
    fn transition_after_child_content(&mut self, rule: RuleId) {
        if matches!(rule, RuleId::StartTag(..) | RuleId::Content(..)) {
            self.enter_content();
        }
    }

    fn require_no_pending_ns(&self, next: &'static str) -> Result<()> {
        if self.pending_ns.is_empty() {
            Ok(())
        } else {
            Err(Error::proc_state("SE after NS events", next))
        }
    }

    /// n-Bit-Feld, bei byte-aligned Streams auf ganze Bytes geweitet.
    pub(crate) fn write_n_bits(&mut self, value: u64, bits: u8) {
        if self.options.byte_aligned() {
            n_bit_unsigned_integer::encode_byte_aligned(&mut self.writer, value, bits);
        } else {
            n_bit_unsigned_integer::encode(&mut self.writer, value, bits);
        }
    }
}
