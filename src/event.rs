//! EXI event model (Spec Section 4, Table 4-1).
//!
//! Die 12 EXI-Event-Typen mit ihren Content-Strukturen. Appendix B
//! beschreibt die Abbildung auf XML Information Items.

use std::rc::Rc;

use crate::qname::QName;

/// Content for Attribute (AT) events: qname + value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtContent {
    /// The qualified name of the attribute.
    pub qname: Rc<QName>,
    /// The attribute value (schema-less: immer String).
    pub value: Rc<str>,
}

/// Content for Characters (CH) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChContent {
    /// The character data.
    pub value: Rc<str>,
}

/// Content for Namespace Declaration (NS) events.
///
/// Spec 4: Bei `local_element_ns = true` MUSS die URI zur URI des
/// zugehörigen SE-Events passen; der Prefix wird dann dem Element
/// zugeschrieben.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsContent {
    /// The namespace URI being declared (empty rescinds the binding).
    pub uri: Rc<str>,
    /// The prefix bound to the URI (empty = default namespace).
    pub prefix: Rc<str>,
    /// True if this NS event names the namespace of the associated element.
    pub local_element_ns: bool,
}

/// Content for Comment (CM) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmContent {
    /// The comment text.
    pub text: Rc<str>,
}

/// Content for Processing Instruction (PI) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiContent {
    /// The PI target.
    pub target: Rc<str>,
    /// The PI data (leer wenn keine).
    pub data: Rc<str>,
}

/// Content for DOCTYPE (DT) events: name + public + system + text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtContent {
    /// The document type name.
    pub name: Rc<str>,
    /// The public identifier (empty if none).
    pub public: Rc<str>,
    /// The system identifier (empty if none).
    pub system: Rc<str>,
    /// The internal subset (empty if none).
    pub text: Rc<str>,
}

/// Content for Entity Reference (ER) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErContent {
    /// The entity name.
    pub name: Rc<str>,
}

/// EXI event types (Spec Section 4, Table 4-1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExiEvent {
    /// SD – start of the document.
    StartDocument,
    /// ED – end of the document.
    EndDocument,
    /// SE – begins an element.
    StartElement(Rc<QName>),
    /// EE – closes the current element.
    EndElement,
    /// AT – an attribute of the current start tag.
    Attribute(AtContent),
    /// CH – character data.
    Characters(ChContent),
    /// NS – binds a prefix to a URI.
    NamespaceDeclaration(NsContent),
    /// CM – a comment (nur bei `Preserve.comments`).
    Comment(CmContent),
    /// PI – a processing instruction (nur bei `Preserve.pis`).
    ProcessingInstruction(PiContent),
    /// DT – a document type declaration (nur bei `Preserve.dtd`).
    DocType(DtContent),
    /// ER – an unexpanded entity reference (nur bei `Preserve.dtd`).
    EntityReference(ErContent),
    /// SC – marks a self-contained element.
    SelfContained,
}

impl ExiEvent {
    /// Das zweibuchstabige Event-Kürzel der Spec (Table 4-1).
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::StartDocument => "SD",
            Self::EndDocument => "ED",
            Self::StartElement(_) => "SE",
            Self::EndElement => "EE",
            Self::Attribute(_) => "AT",
            Self::Characters(_) => "CH",
            Self::NamespaceDeclaration(_) => "NS",
            Self::Comment(_) => "CM",
            Self::ProcessingInstruction(_) => "PI",
            Self::DocType(_) => "DT",
            Self::EntityReference(_) => "ER",
            Self::SelfContained => "SC",
        }
    }
}
