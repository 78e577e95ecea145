use std::path::Path;

use crate::FileAccessError;
use crate::IniDocument;
use crate::Result;
use crate::StoreError;
use crate::StructuredTextCodec;

const CAR_ID_KEY: &str = "RSFCarID";

/// The game's car slot table (`Cars/Cars.ini`).
#[derive(Debug, Clone, Default)]
pub struct CarRoster {
    document: IniDocument,
}

impl CarRoster {
    pub fn new(document: IniDocument) -> Self {
        Self { document }
    }

    pub async fn load(
        path: &Path,
        codec: &dyn StructuredTextCodec,
    ) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FileAccessError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(codec.parse(&text)?))
    }

    /// Car identity of slot `slot`, read from section `Car0<slot>`.
    pub fn car_id(
        &self,
        slot: u32,
    ) -> Result<u32> {
        let section = self
            .document
            .section(&format!("Car0{}", slot))
            .ok_or(StoreError::UnknownSlot { slot })?;
        let car_id = section
            .get(CAR_ID_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .ok_or(StoreError::MissingCarId { slot })?;
        Ok(car_id)
    }
}
