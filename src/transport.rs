/// The only thing the core needs from a reader: send one command APDU, get the raw response
/// (data followed by the two status bytes) back.
///
/// Opening and closing the reader session is up to the implementor.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

impl<T: Transport> Transport for &mut T {
    type Error = T::Error;

    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        (**self).transmit(command)
    }
}

#[cfg(feature = "pcsc")]
pub mod reader {
    //! PC/SC backed transport.

    use std::ffi::CString;

    use log::info;
    use pcsc::{Card, Context, Disposition, Protocols, Scope, ShareMode};

    use super::Transport;

    impl Transport for Card {
        type Error = pcsc::Error;

        fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
            let mut buf = [0u8; pcsc::MAX_BUFFER_SIZE];
            let response = Card::transmit(self, command, &mut buf)?;
            Ok(response.to_vec())
        }
    }

    /// Lists the names of all connected readers.
    pub fn list_readers() -> Result<Vec<String>, pcsc::Error> {
        let ctx = Context::establish(Scope::User)?;
        Ok(ctx
            .list_readers_owned()?
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Connects to the tag on `reader`, or on the first reader found if `None`.
    pub fn connect(reader: Option<&str>) -> Result<Card, pcsc::Error> {
        let ctx = Context::establish(Scope::User)?;
        let name = match reader {
            Some(name) => CString::new(name).map_err(|_| pcsc::Error::UnknownReader)?,
            None => ctx
                .list_readers_owned()?
                .into_iter()
                .next()
                .ok_or(pcsc::Error::NoReadersAvailable)?,
        };
        info!("using reader {}", name.to_string_lossy());
        ctx.connect(&name, ShareMode::Shared, Protocols::ANY)
    }

    /// Disconnects and powers down the tag.
    pub fn disconnect(card: Card) -> Result<(), pcsc::Error> {
        card.disconnect(Disposition::UnpowerCard)
            .map_err(|(_, e)| e)
    }
}
