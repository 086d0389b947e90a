use deferrable_codec::Value;

/// A pair of hooks run at push and pop time, sharing a namespace under
/// which their encoded side-channel value lives in `item.metadata`.
///
/// `produce_metadata` runs once per `later` call, after the envelope's
/// other fields are populated; `consume_metadata` runs once per `run_once`
/// pop, before the call is decoded and invoked, receiving whatever value
/// was stored at `item.metadata[namespace()]` (if any).
pub trait MetadataProducerConsumer: Send + Sync {
    /// The key this pair's value lives under in `item.metadata`. Must be
    /// unique among all pairs registered on one engine.
    fn namespace(&self) -> &'static str;

    /// Produces the value to attach to an outgoing item.
    fn produce_metadata(&self) -> Value;

    /// Consumes the value attached to an incoming item, if one was stored
    /// (older items pushed before this pair was registered may lack it).
    fn consume_metadata(&self, value: Option<&Value>);
}
