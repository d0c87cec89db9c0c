//! Built-in XML grammars (Spec 8.4).
//!
//! Schema-less EXI kennt drei Grammatiken: Document (8.4.1), Fragment
//! (8.4.2) und Element (8.4.3). Element-Grammatiken entstehen beim ersten
//! Auftreten eines QNames und werden unter `(URI-ID, LocalName-ID)`
//! gecacht; sie lernen aus dem Stream:
//!
//! - `SE(*)` gematcht → Production `SE(qname)` mit Event-Code 0, alle
//!   anderen ersten Teile rücken um 1 auf
//! - `AT(*)` gematcht → `AT(qname)` analog
//! - `CH`/`EE` über einen zweiteiligen Code gematcht → einteilige
//!   Production mit Code 0
//!
//! Der jüngst gelernte Name bekommt damit den kürzesten Code — Lernen ist
//! deterministisch und läuft auf Encoder und Decoder im Gleichschritt.
//! Ein per-Regel-Limit deckelt das Wachstum bei feindlichen Strömen; die
//! Wildcard bleibt als Fallback bestehen.
//!
//! Die statischen Productions zweiter und dritter Stufe hängen nur von den
//! Fidelity-Optionen ab und werden einmal pro Codec vorberechnet.

use crate::bitstream::{BitReader, BitWriter};
use crate::event_code::{read_part, write_part};
use crate::options::ExiOptions;
use crate::{Error, FastHashMap, Result};

/// Obergrenze gelernter Productions pro Regel.
///
/// Verhindert unbegrenztes Wachstum durch bösartige Streams; am Limit
/// bleibt die Wildcard-Production als Fallback in Kraft.
const MAX_LEARNED_PRODUCTIONS: usize = 100_000;

/// Eine aufgelöste Production des Built-in-Systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    StartDocument,
    EndDocument,
    /// SE(*) — QName folgt im Stream.
    StartElementWild,
    /// Gelerntes SE(qname), identifiziert über String-Table-IDs.
    StartElementQName(u32, u32),
    EndElement,
    /// AT(*) — QName folgt im Stream.
    AttributeWild,
    /// Gelerntes AT(qname).
    AttributeQName(u32, u32),
    Characters,
    NamespaceDecl,
    SelfContained,
    EntityRef,
    Comment,
    ProcessingInstr,
    DocType,
}

impl Production {
    /// Das Event-Kürzel für Diagnosen.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::StartDocument => "SD",
            Self::EndDocument => "ED",
            Self::StartElementWild => "SE(*)",
            Self::StartElementQName(..) => "SE(qname)",
            Self::EndElement => "EE",
            Self::AttributeWild => "AT(*)",
            Self::AttributeQName(..) => "AT(qname)",
            Self::Characters => "CH",
            Self::NamespaceDecl => "NS",
            Self::SelfContained => "SC",
            Self::EntityRef => "ER",
            Self::Comment => "CM",
            Self::ProcessingInstr => "PI",
            Self::DocType => "DT",
        }
    }
}

/// Statische Production-Plätze der Built-in-Regeln.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    EndDocument,
    StartElementWild,
    EndElement,
    AttributeWild,
    Characters,
    NamespaceDecl,
    SelfContained,
    EntityRef,
    Comment,
    ProcessingInstr,
    DocType,
}

impl Item {
    fn to_production(self) -> Production {
        match self {
            Self::EndDocument => Production::EndDocument,
            Self::StartElementWild => Production::StartElementWild,
            Self::EndElement => Production::EndElement,
            Self::AttributeWild => Production::AttributeWild,
            Self::Characters => Production::Characters,
            Self::NamespaceDecl => Production::NamespaceDecl,
            Self::SelfContained => Production::SelfContained,
            Self::EntityRef => Production::EntityRef,
            Self::Comment => Production::Comment,
            Self::ProcessingInstr => Production::ProcessingInstr,
            Self::DocType => Production::DocType,
        }
    }
}

/// Eine gelernte Production (immer einteiliger Event-Code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Learned {
    Se(u32, u32),
    At(u32, u32),
    Ch,
    Ee,
}

impl Learned {
    fn to_production(self) -> Production {
        match self {
            Self::Se(u, l) => Production::StartElementQName(u, l),
            Self::At(u, l) => Production::AttributeQName(u, l),
            Self::Ch => Production::Characters,
            Self::Ee => Production::EndElement,
        }
    }
}

/// Die Event-Code-Stufen einer Regel nach Options-Pruning (Spec 8.3).
///
/// `level1` sind die statischen einteiligen Productions NACH der gelernten
/// Zone; `level2`/`level3` hängen an einem Escape-Wert.
#[derive(Debug, Clone)]
struct RuleShape {
    level1: Vec<Item>,
    level2: Vec<Item>,
    level3: Vec<Item>,
}

impl RuleShape {
    fn has_deeper(&self) -> bool {
        !self.level2.is_empty() || !self.level3.is_empty()
    }
}

/// Identifies the current grammar rule of a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleId {
    /// Document / Fragment vor SD (einzige Production: SD, 0 Bits).
    Document,
    /// Nach SD, vor dem Root-Element (Spec 8.4.1).
    DocContent,
    /// Nach dem EE des Root-Elements (Spec 8.4.1).
    DocEnd,
    /// Fragment-Inhalt (Spec 8.4.2); lernt SE(qname).
    FragmentContent,
    /// Start-Tag eines Elements, Schlüssel `(URI-ID, LocalName-ID)`.
    StartTag(u32, u32),
    /// Inhalt eines Elements nach dem Start-Tag.
    Content(u32, u32),
}

/// Per-Element-Grammatik: zwei lernende Regeln (Spec 8.4.3).
///
/// Gelernte Productions stehen älteste-zuerst; der effektive Code einer
/// Production am Index `i` ist `len - 1 - i` (die neueste hat Code 0).
#[derive(Debug, Default, Clone)]
struct ElementGrammar {
    start_tag: Vec<Learned>,
    content: Vec<Learned>,
}

/// The built-in grammar system of one codec instance.
#[derive(Debug)]
pub struct Grammars {
    byte_aligned: bool,
    doc_content: RuleShape,
    doc_end: RuleShape,
    fragment: RuleShape,
    start_tag: RuleShape,
    content: RuleShape,
    /// Element-Grammatiken, erzeugt beim ersten Auftreten des QNames.
    elements: FastHashMap<(u32, u32), ElementGrammar>,
    /// Gelernte SE(qname) der Fragment-Grammatik (Spec 8.4.2).
    fragment_learned: Vec<Learned>,
}

impl Grammars {
    /// Baut das Grammatik-System für die gegebenen Optionen auf.
    pub fn new(opts: &ExiOptions) -> Self {
        let p = &opts.preserve;
        let cm_pi: Vec<Item> = [
            p.comments.then_some(Item::Comment),
            p.pis.then_some(Item::ProcessingInstr),
        ]
        .into_iter()
        .flatten()
        .collect();

        // Spec 8.4.1: DocContent / DocEnd
        let doc_content = RuleShape {
            level1: vec![Item::StartElementWild],
            level2: p.dtd.then_some(Item::DocType).into_iter().collect(),
            level3: cm_pi.clone(),
        };
        let doc_end = RuleShape {
            level1: vec![Item::EndDocument],
            level2: cm_pi.clone(),
            level3: Vec::new(),
        };

        // Spec 8.4.2: FragmentContent
        let fragment = RuleShape {
            level1: vec![Item::StartElementWild, Item::EndDocument],
            level2: cm_pi.clone(),
            level3: Vec::new(),
        };

        // Spec 8.4.3: StartTagContent / ElementContent
        let start_tag = RuleShape {
            level1: Vec::new(),
            level2: [
                Some(Item::EndElement),
                Some(Item::AttributeWild),
                p.prefixes.then_some(Item::NamespaceDecl),
                opts.self_contained.then_some(Item::SelfContained),
                Some(Item::StartElementWild),
                Some(Item::Characters),
                p.dtd.then_some(Item::EntityRef),
            ]
            .into_iter()
            .flatten()
            .collect(),
            level3: cm_pi.clone(),
        };
        let content = RuleShape {
            level1: vec![Item::EndElement],
            level2: [
                Some(Item::StartElementWild),
                Some(Item::Characters),
                p.dtd.then_some(Item::EntityRef),
            ]
            .into_iter()
            .flatten()
            .collect(),
            level3: cm_pi,
        };

        Self {
            byte_aligned: opts.byte_aligned(),
            doc_content,
            doc_end,
            fragment,
            start_tag,
            content,
            elements: FastHashMap::default(),
            fragment_learned: Vec::new(),
        }
    }

    /// Legt die Element-Grammatik für einen QName an, falls noch nicht da.
    pub fn ensure_element(&mut self, uri: u32, local: u32) {
        self.elements.entry((uri, local)).or_default();
    }

    fn rule_parts(&self, rule: RuleId) -> (&RuleShape, &[Learned]) {
        match rule {
            RuleId::Document => unreachable!("Document hat eine implizite SD-Production"),
            RuleId::DocContent => (&self.doc_content, &[]),
            RuleId::DocEnd => (&self.doc_end, &[]),
            RuleId::FragmentContent => (&self.fragment, &self.fragment_learned),
            RuleId::StartTag(u, l) => (
                &self.start_tag,
                self.elements
                    .get(&(u, l))
                    .map_or(&[][..], |g| g.start_tag.as_slice()),
            ),
            RuleId::Content(u, l) => (
                &self.content,
                self.elements
                    .get(&(u, l))
                    .map_or(&[][..], |g| g.content.as_slice()),
            ),
        }
    }

    /// Effektive Anzahl einteiliger Codes (inkl. Escape zur zweiten Stufe).
    fn level1_distinct(shape: &RuleShape, learned: &[Learned]) -> u32 {
        (learned.len() + shape.level1.len()) as u32 + u32::from(shape.has_deeper())
    }

    /// Decodes the next production of `rule` from the stream (Spec 6.2).
    pub fn decode_production(&self, reader: &mut BitReader, rule: RuleId) -> Result<Production> {
        if rule == RuleId::Document {
            // Einzige Production SD: 0 Bits
            return Ok(Production::StartDocument);
        }
        let aligned = self.byte_aligned;
        let (shape, learned) = self.rule_parts(rule);
        let lc = learned.len() as u32;
        let l1 = shape.level1.len() as u32;
        let n1 = Self::level1_distinct(shape, learned);

        let part1 = read_part(reader, n1, aligned)?;
        if part1 < lc {
            // Code k → Index len-1-k (neueste Production hat Code 0)
            return Ok(learned[(lc - 1 - part1) as usize].to_production());
        }
        if part1 < lc + l1 {
            return Ok(shape.level1[(part1 - lc) as usize].to_production());
        }

        let l2 = shape.level2.len() as u32;
        let n2 = l2 + u32::from(!shape.level3.is_empty());
        let part2 = read_part(reader, n2, aligned)?;
        if part2 < l2 {
            return Ok(shape.level2[part2 as usize].to_production());
        }

        let n3 = shape.level3.len() as u32;
        let part3 = read_part(reader, n3, aligned)?;
        Ok(shape.level3[part3 as usize].to_production())
    }

    /// Der Event-Code einer gelernten Production, falls vorhanden.
    pub fn learned_code(&self, rule: RuleId, target: Learned) -> Option<u32> {
        let (_, learned) = self.rule_parts(rule);
        learned
            .iter()
            .position(|&p| p == target)
            .map(|i| (learned.len() - 1 - i) as u32)
    }

    /// Schreibt den einteiligen Code einer gelernten Production.
    pub fn write_learned(&self, writer: &mut BitWriter, rule: RuleId, code: u32) {
        let (shape, learned) = self.rule_parts(rule);
        let n1 = Self::level1_distinct(shape, learned);
        write_part(writer, code, n1, self.byte_aligned);
    }

    /// Schreibt den Code einer statischen Production.
    ///
    /// [`Error::InconsistentProcState`] wenn die Regel das Item unter den
    /// aktiven Optionen nicht führt (z.B. CM ohne `Preserve.comments`).
    pub fn write_item(&self, writer: &mut BitWriter, rule: RuleId, item: Item) -> Result<()> {
        let aligned = self.byte_aligned;
        let (shape, learned) = self.rule_parts(rule);
        let lc = learned.len() as u32;
        let n1 = Self::level1_distinct(shape, learned);

        if let Some(i) = shape.level1.iter().position(|&x| x == item) {
            write_part(writer, lc + i as u32, n1, aligned);
            return Ok(());
        }

        let l2 = shape.level2.len() as u32;
        let n2 = l2 + u32::from(!shape.level3.is_empty());
        if let Some(i) = shape.level2.iter().position(|&x| x == item) {
            write_part(writer, n1 - 1, n1, aligned);
            write_part(writer, i as u32, n2, aligned);
            return Ok(());
        }

        if let Some(i) = shape.level3.iter().position(|&x| x == item) {
            write_part(writer, n1 - 1, n1, aligned);
            write_part(writer, l2, n2, aligned);
            write_part(writer, i as u32, shape.level3.len() as u32, aligned);
            return Ok(());
        }

        Err(Error::proc_state(
            "production available in current rule",
            item.to_production().short_name(),
        ))
    }

    /// Lernt eine Production in der Regel (Spec 8.4.2/8.4.3).
    ///
    /// Dedupliziert: bereits vorhandene Productions (gelernt oder statisch
    /// einteilig) werden nicht erneut gelernt. No-op oberhalb des
    /// Lern-Limits.
    pub fn learn(&mut self, rule: RuleId, new: Learned) {
        // ElementContent führt EE bereits einteilig (Spec 8.4.3) — nichts
        // zu lernen; zweiteilig gematchtes EE lernt nur StartTagContent.
        if new == Learned::Ee && matches!(rule, RuleId::Content(..)) {
            return;
        }

        let learned = match rule {
            RuleId::FragmentContent => &mut self.fragment_learned,
            RuleId::StartTag(u, l) => {
                &mut self.elements.entry((u, l)).or_default().start_tag
            }
            RuleId::Content(u, l) => &mut self.elements.entry((u, l)).or_default().content,
            // Document/DocContent/DocEnd lernen nicht (Spec 8.4.1)
            _ => return,
        };
        if learned.len() >= MAX_LEARNED_PRODUCTIONS || learned.contains(&new) {
            return;
        }
        learned.push(new);
    }

    /// Anzahl gelernter Productions einer Regel (für Tests/Diagnose).
    pub fn learned_count(&self, rule: RuleId) -> usize {
        self.rule_parts(rule).1.len()
    }
}
