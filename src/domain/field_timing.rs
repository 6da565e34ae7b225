//! Timing taxonomy for market-data fields.
//!
//! Every surfaced field is classified by when it becomes knowable. STATIC and
//! OPEN_KNOWN fields may be read same-day at trade entry; CLOSE_DERIVED fields
//! only exist after the close and must be lagged one trading day. The registry
//! is a closed enum so an unclassified field cannot compile.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldTiming {
    /// Calendar facts, fixed before the market opens.
    Static,
    /// Observable at or before the market open.
    OpenKnown,
    /// Finalized only after the day's close; requires a one-day lag.
    CloseDerived,
}

/// Closed registry of every market-daily column surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketField {
    DayOfWeek,
    Month,
    IsOpex,
    Open,
    PriorClose,
    GapPct,
    VixOpen,
    VixGapPct,
    PrevReturnPct,
    Close,
    TotalReturnPct,
    IntradayReturnPct,
    ClosePositionInRange,
    GapFilled,
    VixClose,
    VixChangePct,
    VixPercentile,
    VolRegime,
    Vix9dVixRatio,
    VixVix3mRatio,
    TermStructureState,
    Rsi14,
    AtrPct,
    TrendScore,
    BbPosition,
    Return5d,
    ConsecutiveDays,
}

impl MarketField {
    pub const ALL: [MarketField; 27] = [
        MarketField::DayOfWeek,
        MarketField::Month,
        MarketField::IsOpex,
        MarketField::Open,
        MarketField::PriorClose,
        MarketField::GapPct,
        MarketField::VixOpen,
        MarketField::VixGapPct,
        MarketField::PrevReturnPct,
        MarketField::Close,
        MarketField::TotalReturnPct,
        MarketField::IntradayReturnPct,
        MarketField::ClosePositionInRange,
        MarketField::GapFilled,
        MarketField::VixClose,
        MarketField::VixChangePct,
        MarketField::VixPercentile,
        MarketField::VolRegime,
        MarketField::Vix9dVixRatio,
        MarketField::VixVix3mRatio,
        MarketField::TermStructureState,
        MarketField::Rsi14,
        MarketField::AtrPct,
        MarketField::TrendScore,
        MarketField::BbPosition,
        MarketField::Return5d,
        MarketField::ConsecutiveDays,
    ];

    /// Exact column name, the wire contract for context sub-maps.
    pub fn name(self) -> &'static str {
        match self {
            MarketField::DayOfWeek => "Day_of_Week",
            MarketField::Month => "Month",
            MarketField::IsOpex => "Is_Opex",
            MarketField::Open => "open",
            MarketField::PriorClose => "Prior_Close",
            MarketField::GapPct => "Gap_Pct",
            MarketField::VixOpen => "VIX_Open",
            MarketField::VixGapPct => "VIX_Gap_Pct",
            MarketField::PrevReturnPct => "Prev_Return_Pct",
            MarketField::Close => "close",
            MarketField::TotalReturnPct => "Total_Return_Pct",
            MarketField::IntradayReturnPct => "Intraday_Return_Pct",
            MarketField::ClosePositionInRange => "Close_Position_In_Range",
            MarketField::GapFilled => "Gap_Filled",
            MarketField::VixClose => "VIX_Close",
            MarketField::VixChangePct => "VIX_Change_Pct",
            MarketField::VixPercentile => "VIX_Percentile",
            MarketField::VolRegime => "Vol_Regime",
            MarketField::Vix9dVixRatio => "VIX9D_VIX_Ratio",
            MarketField::VixVix3mRatio => "VIX_VIX3M_Ratio",
            MarketField::TermStructureState => "Term_Structure_State",
            MarketField::Rsi14 => "RSI_14",
            MarketField::AtrPct => "ATR_Pct",
            MarketField::TrendScore => "Trend_Score",
            MarketField::BbPosition => "BB_Position",
            MarketField::Return5d => "Return_5D",
            MarketField::ConsecutiveDays => "Consecutive_Days",
        }
    }

    pub fn timing(self) -> FieldTiming {
        match self {
            MarketField::DayOfWeek | MarketField::Month | MarketField::IsOpex => {
                FieldTiming::Static
            }
            MarketField::Open
            | MarketField::PriorClose
            | MarketField::GapPct
            | MarketField::VixOpen
            | MarketField::VixGapPct
            | MarketField::PrevReturnPct => FieldTiming::OpenKnown,
            MarketField::Close
            | MarketField::TotalReturnPct
            | MarketField::IntradayReturnPct
            | MarketField::ClosePositionInRange
            | MarketField::GapFilled
            | MarketField::VixClose
            | MarketField::VixChangePct
            | MarketField::VixPercentile
            | MarketField::VolRegime
            | MarketField::Vix9dVixRatio
            | MarketField::VixVix3mRatio
            | MarketField::TermStructureState
            | MarketField::Rsi14
            | MarketField::AtrPct
            | MarketField::TrendScore
            | MarketField::BbPosition
            | MarketField::Return5d
            | MarketField::ConsecutiveDays => FieldTiming::CloseDerived,
        }
    }

    /// Fields safe to read same-day at entry: STATIC plus OPEN_KNOWN.
    pub fn entry_safe(self) -> bool {
        !matches!(self.timing(), FieldTiming::CloseDerived)
    }
}
