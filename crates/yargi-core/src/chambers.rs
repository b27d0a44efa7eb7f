//! Closed set of chamber/board codes and their backend-native names.
//!
//! Arguments use the short codes (`H1`, `C12`, `HGK`, `D5`, ...); adapters
//! translate to the Turkish strings the backends expect. The mapping is total:
//! every code has exactly one native name, and `ALL` maps to "no filter".

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// High court a chamber code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Court {
    /// Yargıtay chambers and assemblies.
    Yargitay,
    /// Danıştay chambers and boards.
    Danistay,
    /// Military high administrative court (historical).
    Military,
}

macro_rules! chamber_codes {
    ($( $variant:ident => ($court:ident, $native:literal) ),+ $(,)?) => {
        /// Chamber/board filter code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "UPPERCASE")]
        #[allow(missing_docs)]
        pub enum ChamberCode {
            /// No chamber filter.
            All,
            $( $variant, )+
        }

        impl ChamberCode {
            /// Backend-native Turkish name; `None` for [`ChamberCode::All`].
            pub const fn native_name(self) -> Option<&'static str> {
                match self {
                    Self::All => None,
                    $( Self::$variant => Some($native), )+
                }
            }

            /// Which high court the code belongs to; `None` for `All`.
            pub const fn court(self) -> Option<Court> {
                match self {
                    Self::All => None,
                    $( Self::$variant => Some(Court::$court), )+
                }
            }
        }
    };
}

chamber_codes! {
    // Yargıtay civil chambers
    H1 => (Yargitay, "1. Hukuk Dairesi"),
    H2 => (Yargitay, "2. Hukuk Dairesi"),
    H3 => (Yargitay, "3. Hukuk Dairesi"),
    H4 => (Yargitay, "4. Hukuk Dairesi"),
    H5 => (Yargitay, "5. Hukuk Dairesi"),
    H6 => (Yargitay, "6. Hukuk Dairesi"),
    H7 => (Yargitay, "7. Hukuk Dairesi"),
    H8 => (Yargitay, "8. Hukuk Dairesi"),
    H9 => (Yargitay, "9. Hukuk Dairesi"),
    H10 => (Yargitay, "10. Hukuk Dairesi"),
    H11 => (Yargitay, "11. Hukuk Dairesi"),
    H12 => (Yargitay, "12. Hukuk Dairesi"),
    H13 => (Yargitay, "13. Hukuk Dairesi"),
    H14 => (Yargitay, "14. Hukuk Dairesi"),
    H15 => (Yargitay, "15. Hukuk Dairesi"),
    H16 => (Yargitay, "16. Hukuk Dairesi"),
    H17 => (Yargitay, "17. Hukuk Dairesi"),
    H18 => (Yargitay, "18. Hukuk Dairesi"),
    H19 => (Yargitay, "19. Hukuk Dairesi"),
    H20 => (Yargitay, "20. Hukuk Dairesi"),
    H21 => (Yargitay, "21. Hukuk Dairesi"),
    H22 => (Yargitay, "22. Hukuk Dairesi"),
    H23 => (Yargitay, "23. Hukuk Dairesi"),
    // Yargıtay criminal chambers
    C1 => (Yargitay, "1. Ceza Dairesi"),
    C2 => (Yargitay, "2. Ceza Dairesi"),
    C3 => (Yargitay, "3. Ceza Dairesi"),
    C4 => (Yargitay, "4. Ceza Dairesi"),
    C5 => (Yargitay, "5. Ceza Dairesi"),
    C6 => (Yargitay, "6. Ceza Dairesi"),
    C7 => (Yargitay, "7. Ceza Dairesi"),
    C8 => (Yargitay, "8. Ceza Dairesi"),
    C9 => (Yargitay, "9. Ceza Dairesi"),
    C10 => (Yargitay, "10. Ceza Dairesi"),
    C11 => (Yargitay, "11. Ceza Dairesi"),
    C12 => (Yargitay, "12. Ceza Dairesi"),
    C13 => (Yargitay, "13. Ceza Dairesi"),
    C14 => (Yargitay, "14. Ceza Dairesi"),
    C15 => (Yargitay, "15. Ceza Dairesi"),
    C16 => (Yargitay, "16. Ceza Dairesi"),
    C17 => (Yargitay, "17. Ceza Dairesi"),
    C18 => (Yargitay, "18. Ceza Dairesi"),
    C19 => (Yargitay, "19. Ceza Dairesi"),
    C20 => (Yargitay, "20. Ceza Dairesi"),
    C21 => (Yargitay, "21. Ceza Dairesi"),
    C22 => (Yargitay, "22. Ceza Dairesi"),
    C23 => (Yargitay, "23. Ceza Dairesi"),
    // Yargıtay assemblies and councils
    Hgk => (Yargitay, "Hukuk Genel Kurulu"),
    Cgk => (Yargitay, "Ceza Genel Kurulu"),
    Bgk => (Yargitay, "Büyük Genel Kurulu"),
    Hbk => (Yargitay, "Hukuk Daireleri Başkanlar Kurulu"),
    Cbk => (Yargitay, "Ceza Daireleri Başkanlar Kurulu"),
    // Danıştay chambers
    D1 => (Danistay, "1. Daire"),
    D2 => (Danistay, "2. Daire"),
    D3 => (Danistay, "3. Daire"),
    D4 => (Danistay, "4. Daire"),
    D5 => (Danistay, "5. Daire"),
    D6 => (Danistay, "6. Daire"),
    D7 => (Danistay, "7. Daire"),
    D8 => (Danistay, "8. Daire"),
    D9 => (Danistay, "9. Daire"),
    D10 => (Danistay, "10. Daire"),
    D11 => (Danistay, "11. Daire"),
    D12 => (Danistay, "12. Daire"),
    D13 => (Danistay, "13. Daire"),
    D14 => (Danistay, "14. Daire"),
    D15 => (Danistay, "15. Daire"),
    D16 => (Danistay, "16. Daire"),
    D17 => (Danistay, "17. Daire"),
    // Danıştay boards
    Dbgk => (Danistay, "Büyük Gen.Kur."),
    Iddk => (Danistay, "İdare Dava Daireleri Kurulu"),
    Vddk => (Danistay, "Vergi Dava Daireleri Kurulu"),
    Ibk => (Danistay, "İçtihatları Birleştirme Kurulu"),
    Iik => (Danistay, "İdari İşler Kurulu"),
    Dbk => (Danistay, "Başkanlar Kurulu"),
    // Military high administrative court
    Ayim => (Military, "Askeri Yüksek İdare Mahkemesi"),
    Ayimdk => (Military, "Askeri Yüksek İdare Mahkemesi Daireler Kurulu"),
    Ayimb => (Military, "Askeri Yüksek İdare Mahkemesi Başsavcılığı"),
    Ayim1 => (Military, "Askeri Yüksek İdare Mahkemesi 1. Daire"),
    Ayim2 => (Military, "Askeri Yüksek İdare Mahkemesi 2. Daire"),
    Ayim3 => (Military, "Askeri Yüksek İdare Mahkemesi 3. Daire"),
}

impl ChamberCode {
    /// Native name or the empty string (the "no filter" form most backends
    /// expect for `ALL`).
    pub fn native_or_empty(self) -> &'static str {
        self.native_name().unwrap_or("")
    }
}

impl Default for ChamberCode {
    fn default() -> Self {
        Self::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_maps_to_no_filter() {
        assert_eq!(ChamberCode::All.native_name(), None);
        assert_eq!(ChamberCode::All.native_or_empty(), "");
    }

    #[test]
    fn civil_and_criminal_numbering() {
        assert_eq!(ChamberCode::H1.native_name(), Some("1. Hukuk Dairesi"));
        assert_eq!(ChamberCode::H23.native_name(), Some("23. Hukuk Dairesi"));
        assert_eq!(ChamberCode::C12.native_name(), Some("12. Ceza Dairesi"));
        assert_eq!(ChamberCode::D17.native_name(), Some("17. Daire"));
    }

    #[test]
    fn wire_names_are_uppercase_codes() {
        let json = serde_json::to_string(&ChamberCode::Hgk).unwrap();
        assert_eq!(json, "\"HGK\"");
        let json = serde_json::to_string(&ChamberCode::Ayim3).unwrap();
        assert_eq!(json, "\"AYIM3\"");
        let parsed: ChamberCode = serde_json::from_str("\"D5\"").unwrap();
        assert_eq!(parsed, ChamberCode::D5);
    }

    #[test]
    fn court_partition() {
        assert_eq!(ChamberCode::H5.court(), Some(Court::Yargitay));
        assert_eq!(ChamberCode::Vddk.court(), Some(Court::Danistay));
        assert_eq!(ChamberCode::Ayim1.court(), Some(Court::Military));
        assert_eq!(ChamberCode::All.court(), None);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(serde_json::from_str::<ChamberCode>("\"H24\"").is_err());
        assert!(serde_json::from_str::<ChamberCode>("\"X1\"").is_err());
    }
}
