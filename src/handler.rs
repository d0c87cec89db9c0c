//! Event sink driven by the body decoder.
//!
//! Der Decoder ruft für jedes decodierte Event die passende Methode auf.
//! Jede Methode kann `Err(Error::HandlerStop)` zurückgeben, um die
//! Verarbeitung sauber abzubrechen; der Decoder reicht das Signal an den
//! Aufrufer durch und bleibt an der aktuellen Position wiederaufsetzbar.
//!
//! Übergebene `&QName`/`&str`-Referenzen sind nur für die Dauer des
//! Callbacks gültig; Handler kopieren, was sie behalten wollen.

use std::rc::Rc;

use crate::event::{
    AtContent, ChContent, CmContent, DtContent, ErContent, ExiEvent, NsContent, PiContent,
};
use crate::qname::QName;
use crate::Result;

/// Receiver for the decoded XML event stream.
///
/// Alle Methoden haben No-op-Defaults; ein Handler implementiert nur, was
/// er braucht. Events, die die aktiven Preserve-Flags ausschließen, kommen
/// nie an.
pub trait ContentHandler {
    /// SD – start of the document.
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// ED – end of the document.
    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// SE – element start. `qname.prefix` ist nur bei `Preserve.prefixes` gesetzt.
    fn start_element(&mut self, qname: &QName) -> Result<()> {
        let _ = qname;
        Ok(())
    }

    /// EE – element end.
    fn end_element(&mut self) -> Result<()> {
        Ok(())
    }

    /// NS – namespace declaration, delivered before the owning SE.
    fn namespace_declaration(&mut self, uri: &str, prefix: &str, local_element_ns: bool) -> Result<()> {
        let _ = (uri, prefix, local_element_ns);
        Ok(())
    }

    /// AT – attribute with value.
    fn attribute(&mut self, qname: &QName, value: &str) -> Result<()> {
        let _ = (qname, value);
        Ok(())
    }

    /// CH – character data.
    fn characters(&mut self, value: &str) -> Result<()> {
        let _ = value;
        Ok(())
    }

    /// CM – comment (`Preserve.comments`).
    fn comment(&mut self, text: &str) -> Result<()> {
        let _ = text;
        Ok(())
    }

    /// PI – processing instruction (`Preserve.pis`).
    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        let _ = (target, data);
        Ok(())
    }

    /// DT – document type declaration (`Preserve.dtd`).
    fn doctype(&mut self, name: &str, public: &str, system: &str, text: &str) -> Result<()> {
        let _ = (name, public, system, text);
        Ok(())
    }

    /// ER – entity reference (`Preserve.dtd`).
    fn entity_reference(&mut self, name: &str) -> Result<()> {
        let _ = name;
        Ok(())
    }

    /// SC – self-contained marker.
    fn self_contained(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects the event stream into a `Vec<ExiEvent>`.
#[derive(Default)]
pub struct EventCollector {
    /// Die gesammelten Events in Stream-Reihenfolge.
    pub events: Vec<ExiEvent>,
}

impl EventCollector {
    /// Ein leerer Collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verbraucht den Collector und gibt die Events zurück.
    pub fn into_events(self) -> Vec<ExiEvent> {
        self.events
    }
}

impl ContentHandler for EventCollector {
    fn start_document(&mut self) -> Result<()> {
        self.events.push(ExiEvent::StartDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.events.push(ExiEvent::EndDocument);
        Ok(())
    }

    fn start_element(&mut self, qname: &QName) -> Result<()> {
        self.events.push(ExiEvent::StartElement(Rc::new(qname.clone())));
        Ok(())
    }

    fn end_element(&mut self) -> Result<()> {
        self.events.push(ExiEvent::EndElement);
        Ok(())
    }

    fn namespace_declaration(&mut self, uri: &str, prefix: &str, local_element_ns: bool) -> Result<()> {
        self.events.push(ExiEvent::NamespaceDeclaration(NsContent {
            uri: uri.into(),
            prefix: prefix.into(),
            local_element_ns,
        }));
        Ok(())
    }

    fn attribute(&mut self, qname: &QName, value: &str) -> Result<()> {
        self.events.push(ExiEvent::Attribute(AtContent {
            qname: Rc::new(qname.clone()),
            value: value.into(),
        }));
        Ok(())
    }

    fn characters(&mut self, value: &str) -> Result<()> {
        self.events.push(ExiEvent::Characters(ChContent {
            value: value.into(),
        }));
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.events.push(ExiEvent::Comment(CmContent { text: text.into() }));
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.events.push(ExiEvent::ProcessingInstruction(PiContent {
            target: target.into(),
            data: data.into(),
        }));
        Ok(())
    }

    fn doctype(&mut self, name: &str, public: &str, system: &str, text: &str) -> Result<()> {
        self.events.push(ExiEvent::DocType(DtContent {
            name: name.into(),
            public: public.into(),
            system: system.into(),
            text: text.into(),
        }));
        Ok(())
    }

    fn entity_reference(&mut self, name: &str) -> Result<()> {
        self.events.push(ExiEvent::EntityReference(ErContent { name: name.into() }));
        Ok(())
    }

    fn self_contained(&mut self) -> Result<()> {
        self.events.push(ExiEvent::SelfContained);
        Ok(())
    }
}
