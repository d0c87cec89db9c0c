//! EXI stream decoder (Spec 5, 6, 8.4).
//!
//! Liest Header und Body eines schema-less EXI-Streams und treibt einen
//! [`ContentHandler`] mit den decodierten Events. Grammatiken und
//! String-Tabelle entwickeln sich im Gleichschritt mit dem Encoder.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exicore::decoder::decode;
//! use exicore::encoder::encode;
//! use exicore::{ExiEvent, ExiOptions, QName};
//!
//! let events_in = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "root"))),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let bytes = encode(&events_in, &ExiOptions::default()).unwrap();
//! let (events_out, _opts) = decode(&bytes).unwrap();
//! assert_eq!(events_in, events_out);
//! ```

mod qname;
mod value;

use crate::bitstream::BitReader;
use crate::event::ExiEvent;
use crate::grammar::{Grammars, Learned, Production, RuleId};
use crate::handler::{ContentHandler, EventCollector};
use crate::header::{self, ExiHeader};
use crate::options::{Alignment, ExiOptions};
use crate::qname::QName;
use crate::string_table::StringTable;
use crate::{n_bit_unsigned_integer, options_codec, string, Error, Result};

/// Decodes a complete EXI document with default (or in-header) options.
pub fn decode(data: &[u8]) -> Result<(Vec<ExiEvent>, ExiOptions)> {
    decode_with_options(data, ExiOptions::default())
}

/// Decodes with out-of-band options; in-header options take precedence
/// (Spec 5.4: absent options are communicated out-of-band).
pub fn decode_with_options(
    data: &[u8],
    options: ExiOptions,
) -> Result<(Vec<ExiEvent>, ExiOptions)> {
    let mut decoder = Decoder::with_options(data, options);
    let mut collector = EventCollector::new();
    decoder.run(&mut collector)?;
    Ok((collector.into_events(), decoder.options().clone()))
}

/// Dokument-Phase außerhalb von Element-Grammatiken (Spec 8.4.1, 8.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocPhase {
    BeforeSd,
    DocContent,
    DocEnd,
    FragmentContent,
}

/// Ein offenes Element auf dem Grammar-Stack.
struct ElementCtx {
    uri: u32,
    local: u32,
    /// false = StartTagContent, true = ElementContent (Spec 8.4.3).
    in_content: bool,
}

/// Gepufferte NS-Deklaration bis zur SE-Emission.
pub(crate) struct PendingNs {
    pub(crate) uri: std::rc::Rc<str>,
    pub(crate) prefix: std::rc::Rc<str>,
    pub(crate) local_element_ns: bool,
}

/// EXI stream decoder over a byte slice.
pub struct Decoder<'a> {
    pub(crate) reader: BitReader<'a>,
    pub(crate) options: ExiOptions,
    pub(crate) table: StringTable,
    grammars: Grammars,
    stack: Vec<ElementCtx>,
    phase: DocPhase,
    header: Option<ExiHeader>,
    finished: bool,
    /// SE wartet auf nachfolgende NS-Events (nur bei `Preserve.prefixes`);
    /// die QName-IDs bleiben für den CH-Value-Kontext erhalten.
    pending_element: Option<QName>,
    pending_ns: Vec<PendingNs>,
}

impl<'a> Decoder<'a> {
    /// Decoder mit Default-Optionen (Header-Options überschreiben).
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, ExiOptions::default())
    }

    /// Decoder mit out-of-band Optionen.
    pub fn with_options(data: &'a [u8], options: ExiOptions) -> Self {
        // Tabelle und Grammatiken werden nach dem Header (endgültige
        // Optionen!) neu aufgebaut; diese Instanzen sind Platzhalter.
        let table = StringTable::from_options(&options);
        let grammars = Grammars::new(&options);
        Self {
            reader: BitReader::new(data),
            options,
            table,
            grammars,
            stack: Vec::with_capacity(16),
            phase: DocPhase::BeforeSd,
            header: None,
            finished: false,
            pending_element: None,
            pending_ns: Vec::new(),
        }
    }

    /// Die effektiven Optionen (nach Header-Decode inkl. Header-Options).
    pub fn options(&self) -> &ExiOptions {
        &self.options
    }

    /// Der decodierte Header (None vor dem ersten Event).
    pub fn header(&self) -> Option<&ExiHeader> {
        self.header.as_ref()
    }

    /// Aktuelle Bit-Position im Eingabepuffer (für Diagnosen).
    pub fn bit_position(&self) -> usize {
        self.reader.bit_position()
    }

    /// Ob das Dokument vollständig decodiert ist (ED gesehen).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decodes the whole stream, driving `handler` (Spec 6).
    ///
    /// `Err(HandlerStop)` wenn der Handler abbricht; die Position bleibt
    /// hinter dem zuletzt ausgelieferten Event stehen.
    pub fn run(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        while !self.finished {
            self.decode_event(handler)?;
        }
        Ok(())
    }

    /// Liest den Header und konfiguriert den Codec (Spec 5).
    fn read_header(&mut self) -> Result<()> {
        let header = header::decode(&mut self.reader, false)?;
        if header.is_preview || header.version != 1 {
            return Err(Error::invalid_header(format!(
                "unsupported format version {}{}",
                header.version,
                if header.is_preview { " (preview)" } else { "" }
            )));
        }
        if header.options_present {
            self.options = options_codec::decode(&mut self.reader)?;
        }
        self.options.validate()?;
        if self.options.byte_aligned() {
            self.reader.align_to_byte();
        }
        if self.options.effective_alignment() == Alignment::PreCompression {
            return Err(Error::NotImplemented(
                "pre-compression and compressed bodies",
            ));
        }
        // Endgültige Optionen: Tabelle und Grammatiken jetzt aufbauen
        self.table = StringTable::from_options(&self.options);
        self.table.set_decode_only(true);
        self.grammars = Grammars::new(&self.options);
        self.header = Some(header);
        log::debug!(
            "exi header decoded: fragment={} alignment={:?}",
            self.options.fragment,
            self.options.effective_alignment()
        );
        Ok(())
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

    /// Markiert das oberste Element als im Content-Bereich.
    fn enter_content(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.in_content = true;
        }
    }

    /// Liefert gepufferte NS-Events und das wartende SE aus.
    ///
    /// Ein NS mit `local_element_ns` und passender URI liefert den Prefix
    /// des Elements nach (Spec 4, Table 4-2).
    fn flush_pending(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        let Some(mut qname) = self.pending_element.take() else {
            return Ok(());
        };
        for ns in self.pending_ns.drain(..) {
            if ns.local_element_ns && ns.uri == qname.uri {
                qname.prefix = Some(ns.prefix.clone());
            }
            handler.namespace_declaration(&ns.uri, &ns.prefix, ns.local_element_ns)?;
        }
        handler.start_element(&qname)?;
        Ok(())
    }

    /// Decodes and dispatches one production (Spec 6.2, 8.4).
    pub fn decode_event(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        if self.finished {
            return Err(Error::ParsingComplete);
        }
        if self.header.is_none() {
            self.read_header()?;
        }

        let rule = self.current_rule();
        let production = self.grammars.decode_production(&mut self.reader, rule)?;
        log::trace!(
            "decode: {} in {:?} at bit {}",
            production.short_name(),
            rule,
            self.reader.bit_position()
        );

        match production {
            Production::StartDocument => {
                self.phase = if self.options.fragment {
                    DocPhase::FragmentContent
                } else {
                    DocPhase::DocContent
                };
                handler.start_document()?;
            }
            Production::EndDocument => {
                self.flush_pending(handler)?;
                self.finished = true;
                handler.end_document()?;
            }
            Production::StartElementWild => {
                self.flush_pending(handler)?;
                let (qname, uri, local) = self.decode_qname()?;
                self.grammars.learn(rule, Learned::Se(uri, local));
                self.push_element(rule, qname, uri, local, handler)?;
            }
            Production::StartElementQName(uri, local) => {
                self.flush_pending(handler)?;
                let qname = self.known_qname(uri, local)?;
                self.push_element(rule, qname, uri, local, handler)?;
            }
            Production::EndElement => {
                self.flush_pending(handler)?;
                self.grammars.learn(rule, Learned::Ee);
                self.stack.pop();
                handler.end_element()?;
            }
            Production::AttributeWild => {
                self.flush_pending(handler)?;
                let (qname, uri, local) = self.decode_qname()?;
                self.grammars.learn(rule, Learned::At(uri, local));
                let value = self.decode_value(uri, local)?;
                handler.attribute(&qname, &value)?;
            }
            Production::AttributeQName(uri, local) => {
                self.flush_pending(handler)?;
                let qname = self.known_qname(uri, local)?;
                let value = self.decode_value(uri, local)?;
                handler.attribute(&qname, &value)?;
            }
            Production::Characters => {
                self.flush_pending(handler)?;
                self.grammars.learn(rule, Learned::Ch);
                let top = self.stack.last().ok_or_else(|| {
                    Error::invalid_input("CH outside of any element")
                })?;
                let (uri, local) = (top.uri, top.local);
                self.enter_content();
                let value = self.decode_value(uri, local)?;
                handler.characters(&value)?;
            }
            Production::NamespaceDecl => {
                let ns = self.decode_ns_content()?;
                if self.pending_element.is_some() {
                    self.pending_ns.push(ns);
                } else {
                    handler.namespace_declaration(&ns.uri, &ns.prefix, ns.local_element_ns)?;
                }
            }
            Production::SelfContained => {
                return Err(Error::NotImplemented("self-contained sub-streams"));
            }
            Production::EntityRef => {
                self.flush_pending(handler)?;
                self.enter_content();
                let name = string::decode(&mut self.reader)?;
                handler.entity_reference(&name)?;
            }
            Production::Comment => {
                self.flush_pending(handler)?;
                self.enter_content();
                let text = string::decode(&mut self.reader)?;
                handler.comment(&text)?;
            }
            Production::ProcessingInstr => {
                self.flush_pending(handler)?;
                self.enter_content();
                let target = string::decode(&mut self.reader)?;
                let data = string::decode(&mut self.reader)?;
                handler.processing_instruction(&target, &data)?;
            }
            Production::DocType => {
                let name = string::decode(&mut self.reader)?;
                let public = string::decode(&mut self.reader)?;
                let system = string::decode(&mut self.reader)?;
                let text = string::decode(&mut self.reader)?;
                handler.doctype(&name, &public, &system, &text)?;
            }
        }
        Ok(())
    }

    /// Gemeinsame SE-Nacharbeit: Übergänge, Stack, Emission/Pufferung.
    fn push_element(
        &mut self,
        matched_rule: RuleId,
        qname: QName,
        uri: u32,
        local: u32,
        handler: &mut dyn ContentHandler,
    ) -> Result<()> {
        // Übergang der Regel, in der SE gematcht wurde (Spec 8.4)
        match matched_rule {
            RuleId::DocContent => self.phase = DocPhase::DocEnd,
            RuleId::StartTag(..) => self.enter_content(),
            // Content bleibt Content, FragmentContent bleibt FragmentContent
            _ => {}
        }
        self.grammars.ensure_element(uri, local);
        self.stack.push(ElementCtx {
            uri,
            local,
            in_content: false,
        });
        if self.options.preserve.prefixes {
            // NS-Events folgen dem SE im Stream, gehören aber davor
            self.pending_element = Some(qname);
        } else {
            handler.start_element(&qname)?;
        }
        Ok(())
    }

    /// n-Bit-Feld, bei byte-aligned Streams auf ganze Bytes geweitet
    /// (Spec 7.1.9).
    pub(crate) fn read_n_bits(&mut self, bits: u8) -> Result<u64> {
        if self.options.byte_aligned() {
            n_bit_unsigned_integer::decode_byte_aligned(&mut self.reader, bits)
        } else {
            n_bit_unsigned_integer::decode(&mut self.reader, bits)
        }
    }
}
