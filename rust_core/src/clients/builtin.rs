//! Static reference catalog for offline use.
//!
//! Covers the major NSE/BSE indices, the NIFTY 50 constituents and a set of
//! popular midcaps. Served through [`ReferenceDataSource`] so it goes through
//! the same column detection as a downloaded scrip master.

use super::ReferenceDataSource;
use crate::master::ReferenceTable;
use anyhow::Result;
use async_trait::async_trait;

/// (trading symbol, name, security id, raw segment)
type Entry = (&'static str, &'static str, &'static str, &'static str);

const NSE_INDICES: &[Entry] = &[
    ("NIFTY 50", "NIFTY 50", "13", "NSE:I"),
    ("NIFTY BANK", "NIFTY BANK", "25", "NSE:I"),
    ("NIFTY IT", "NIFTY IT", "369", "NSE:I"),
    ("NIFTY PHARMA", "NIFTY PHARMA", "1045", "NSE:I"),
    ("NIFTY AUTO", "NIFTY AUTO", "1108", "NSE:I"),
    ("NIFTY METAL", "NIFTY METAL", "1314", "NSE:I"),
    ("NIFTY REALTY", "NIFTY REALTY", "1463", "NSE:I"),
    ("NIFTY FMCG", "NIFTY FMCG", "364", "NSE:I"),
    ("NIFTY MEDIA", "NIFTY MEDIA", "1311", "NSE:I"),
    ("NIFTY PSU BANK", "NIFTY PSU BANK", "1453", "NSE:I"),
    ("NIFTY PVT BANK", "NIFTY PVT BANK", "1452", "NSE:I"),
    ("NIFTY FIN SERVICE", "NIFTY FIN SERVICE", "422", "NSE:I"),
    ("NIFTY NEXT 50", "NIFTY NEXT 50", "423", "NSE:I"),
    ("NIFTY 100", "NIFTY 100", "288", "NSE:I"),
    ("NIFTY 200", "NIFTY 200", "398", "NSE:I"),
    ("NIFTY 500", "NIFTY 500", "412", "NSE:I"),
    ("NIFTY MIDCAP 50", "NIFTY MIDCAP 50", "453", "NSE:I"),
    ("NIFTY MIDCAP 100", "NIFTY MIDCAP 100", "454", "NSE:I"),
    ("NIFTY MIDCAP 150", "NIFTY MIDCAP 150", "455", "NSE:I"),
    ("NIFTY SMALLCAP 50", "NIFTY SMALLCAP 50", "456", "NSE:I"),
    ("NIFTY SMALLCAP 100", "NIFTY SMALLCAP 100", "457", "NSE:I"),
    ("NIFTY SMALLCAP 250", "NIFTY SMALLCAP 250", "458", "NSE:I"),
    ("NIFTY ENERGY", "NIFTY ENERGY", "362", "NSE:I"),
    ("NIFTY INFRA", "NIFTY INFRA", "1031", "NSE:I"),
    ("NIFTY COMMODITIES", "NIFTY COMMODITIES", "347", "NSE:I"),
    ("NIFTY CONSUMPTION", "NIFTY CONSUMPTION", "348", "NSE:I"),
    ("NIFTY CPSE", "NIFTY CPSE", "349", "NSE:I"),
    ("NIFTY PSE", "NIFTY PSE", "1451", "NSE:I"),
    ("NIFTY SERV SECTOR", "NIFTY SERV SECTOR", "1467", "NSE:I"),
    ("NIFTY OIL & GAS", "NIFTY OIL & GAS", "1361", "NSE:I"),
    ("NIFTY HEALTHCARE", "NIFTY HEALTHCARE", "1021", "NSE:I"),
    ("NIFTY INDIA DIGITAL", "NIFTY INDIA DIGITAL", "1092", "NSE:I"),
    ("NIFTY INDIA DEFENCE", "NIFTY INDIA DEFENCE", "1093", "NSE:I"),
    ("NIFTY INDIA MANUFACTURING", "NIFTY INDIA MANUFACTURING", "1094", "NSE:I"),
    ("NIFTY MOBILITY", "NIFTY MOBILITY", "1095", "NSE:I"),
];

const BSE_INDICES: &[Entry] = &[
    ("SENSEX", "S&P BSE SENSEX", "51", "BSE:I"),
    ("BSE 100", "BSE 100", "304", "BSE:I"),
    ("BSE 200", "BSE 200", "305", "BSE:I"),
    ("BSE 500", "BSE 500", "306", "BSE:I"),
    ("BSE MIDCAP", "BSE MIDCAP", "308", "BSE:I"),
    ("BSE SMALLCAP", "BSE SMALLCAP", "309", "BSE:I"),
    ("BSE BANKEX", "BSE BANKEX", "310", "BSE:I"),
    ("BSE TECK", "BSE TECK", "311", "BSE:I"),
    ("BSE AUTO", "BSE AUTO", "312", "BSE:I"),
    ("BSE METAL", "BSE METAL", "313", "BSE:I"),
    ("BSE OIL & GAS", "BSE OIL & GAS", "314", "BSE:I"),
    ("BSE REALTY", "BSE REALTY", "315", "BSE:I"),
    ("BSE POWER", "BSE POWER", "316", "BSE:I"),
    ("BSE CONSUMER DURABLES", "BSE CONSUMER DURABLES", "317", "BSE:I"),
];

const NIFTY50_STOCKS: &[Entry] = &[
    ("HDFCBANK", "HDFC BANK", "1333", "NSE:E"),
    ("ICICIBANK", "ICICI BANK", "4963", "NSE:E"),
    ("KOTAKBANK", "KOTAK MAHINDRA BANK", "1922", "NSE:E"),
    ("AXISBANK", "AXIS BANK", "5900", "NSE:E"),
    ("SBIN", "STATE BANK OF INDIA", "3045", "NSE:E"),
    ("INDUSINDBK", "INDUSIND BANK", "5258", "NSE:E"),
    ("BAJFINANCE", "BAJAJ FINANCE", "317", "NSE:E"),
    ("BAJAJFINSV", "BAJAJ FINSERV", "16675", "NSE:E"),
    ("TCS", "TATA CONSULTANCY SERVICES", "11536", "NSE:E"),
    ("INFY", "INFOSYS", "1594", "NSE:E"),
    ("WIPRO", "WIPRO", "3787", "NSE:E"),
    ("HCLTECH", "HCL TECHNOLOGIES", "7229", "NSE:E"),
    ("TECHM", "TECH MAHINDRA", "13538", "NSE:E"),
    ("MARUTI", "MARUTI SUZUKI INDIA", "10999", "NSE:E"),
    ("M&M", "MAHINDRA & MAHINDRA", "2031", "NSE:E"),
    ("TATAMOTORS", "TATA MOTORS", "3456", "NSE:E"),
    ("BAJAJ-AUTO", "BAJAJ AUTO", "16669", "NSE:E"),
    ("EICHERMOT", "EICHER MOTORS", "910", "NSE:E"),
    ("HEROMOTOCO", "HERO MOTOCORP", "1348", "NSE:E"),
    ("HINDUNILVR", "HINDUSTAN UNILEVER", "1394", "NSE:E"),
    ("ITC", "ITC", "1660", "NSE:E"),
    ("NESTLEIND", "NESTLE INDIA", "17963", "NSE:E"),
    ("BRITANNIA", "BRITANNIA INDUSTRIES", "547", "NSE:E"),
    ("DABUR", "DABUR INDIA", "2732", "NSE:E"),
    ("SUNPHARMA", "SUN PHARMACEUTICAL INDUSTRIES", "3351", "NSE:E"),
    ("DRREDDY", "DR REDDYS LABORATORIES", "881", "NSE:E"),
    ("CIPLA", "CIPLA", "694", "NSE:E"),
    ("DIVISLAB", "DIVIS LABORATORIES", "10940", "NSE:E"),
    ("APOLLOHOSP", "APOLLO HOSPITALS ENTERPRISE", "157", "NSE:E"),
    ("RELIANCE", "RELIANCE INDUSTRIES", "2885", "NSE:E"),
    ("ONGC", "OIL AND NATURAL GAS CORPORATION", "2475", "NSE:E"),
    ("NTPC", "NTPC", "11630", "NSE:E"),
    ("POWERGRID", "POWER GRID CORPORATION OF INDIA", "14977", "NSE:E"),
    ("COALINDIA", "COAL INDIA", "20374", "NSE:E"),
    ("BPCL", "BHARAT PETROLEUM CORPORATION", "526", "NSE:E"),
    ("TATASTEEL", "TATA STEEL", "3499", "NSE:E"),
    ("HINDALCO", "HINDALCO INDUSTRIES", "1363", "NSE:E"),
    ("JSWSTEEL", "JSW STEEL", "11723", "NSE:E"),
    ("VEDL", "VEDANTA", "3063", "NSE:E"),
    ("BHARTIARTL", "BHARTI AIRTEL", "3666", "NSE:E"),
    ("TITAN", "TITAN COMPANY", "3506", "NSE:E"),
    ("ASIANPAINT", "ASIAN PAINTS", "212", "NSE:E"),
    ("ULTRACEMCO", "ULTRATECH CEMENT", "11532", "NSE:E"),
    ("GRASIM", "GRASIM INDUSTRIES", "1232", "NSE:E"),
    ("SHREECEM", "SHREE CEMENT", "3076", "NSE:E"),
    ("LT", "LARSEN & TOUBRO", "11483", "NSE:E"),
    ("ADANIENT", "ADANI ENTERPRISES", "25", "NSE:E"),
    ("ADANIPORTS", "ADANI PORTS AND SPECIAL ECONOMIC ZONE", "15083", "NSE:E"),
];

const MIDCAP_STOCKS: &[Entry] = &[
    ("TATAPOWER", "TATA POWER COMPANY", "3426", "NSE:E"),
    ("GODREJCP", "GODREJ CONSUMER PRODUCTS", "10099", "NSE:E"),
    ("MARICO", "MARICO", "4067", "NSE:E"),
    ("MUTHOOTFIN", "MUTHOOT FINANCE", "23650", "NSE:E"),
    ("INDIGO", "INTERGLOBE AVIATION", "11195", "NSE:E"),
    ("PIDILITIND", "PIDILITE INDUSTRIES", "2664", "NSE:E"),
    ("BANDHANBNK", "BANDHAN BANK", "579", "NSE:E"),
    ("LTTS", "L&T TECHNOLOGY SERVICES", "11908", "NSE:E"),
    ("POLYCAB", "POLYCAB INDIA", "9590", "NSE:E"),
    ("ABCAPITAL", "ADITYA BIRLA CAPITAL", "5", "NSE:E"),
    ("PNB", "PUNJAB NATIONAL BANK", "10666", "NSE:E"),
    ("CANBK", "CANARA BANK", "10794", "NSE:E"),
    ("BANKBARODA", "BANK OF BARODA", "4668", "NSE:E"),
    ("IDFCFIRSTB", "IDFC FIRST BANK", "11184", "NSE:E"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCatalog;

impl BuiltinCatalog {
    pub fn table() -> ReferenceTable {
        let columns = ["trading_symbol", "name", "security_id", "segment"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let rows = [NSE_INDICES, BSE_INDICES, NIFTY50_STOCKS, MIDCAP_STOCKS]
            .iter()
            .flat_map(|group| group.iter())
            .map(|(symbol, name, id, segment)| {
                vec![
                    symbol.to_string(),
                    name.to_string(),
                    id.to_string(),
                    segment.to_string(),
                ]
            })
            .collect();

        ReferenceTable::new(columns, rows)
    }
}

#[async_trait]
impl ReferenceDataSource for BuiltinCatalog {
    fn source_name(&self) -> &str {
        "builtin"
    }

    async fn fetch(&self) -> Result<ReferenceTable> {
        Ok(Self::table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::MasterIndex;
    use crate::matching::aliases::AliasTable;
    use crate::matching::{to_instrument, Resolver};
    use crate::models::InstrumentKey;

    #[test]
    fn test_catalog_builds_index() {
        let index = MasterIndex::build(&BuiltinCatalog::table()).unwrap();
        assert_eq!(index.matchable().count(), index.len());
        assert!(index.len() > 100);
    }

    #[test]
    fn test_default_symbols_resolve() {
        let index = MasterIndex::build(&BuiltinCatalog::table()).unwrap();
        let resolver = Resolver::new(&index).with_aliases(AliasTable::builtin());

        let key = |q: &str| to_instrument(q, &resolver.resolve(q).unwrap()).key();
        assert_eq!(key("NIFTY 50"), InstrumentKey::new("IDX_I", "13"));
        assert_eq!(key("BANKNIFTY"), InstrumentKey::new("IDX_I", "25"));
        assert_eq!(key("SENSEX"), InstrumentKey::new("IDX_I", "51"));
        assert_eq!(key("TATAMOTORS"), InstrumentKey::new("NSE_EQ", "3456"));
        assert_eq!(key("RELIANCE"), InstrumentKey::new("NSE_EQ", "2885"));
        assert_eq!(key("TCS"), InstrumentKey::new("NSE_EQ", "11536"));
    }

    #[test]
    fn test_same_id_in_different_segments() {
        let index = MasterIndex::build(&BuiltinCatalog::table()).unwrap();
        let resolver = Resolver::new(&index);
        let adani = to_instrument("ADANIENT", &resolver.resolve("ADANIENT").unwrap());
        assert_eq!(adani.key(), InstrumentKey::new("NSE_EQ", "25"));
    }
}
