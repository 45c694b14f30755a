pub use evalgen_types::{
	CaseResult, CaseStatus, Message, Role, SuiteResult, SuiteSummary, TestCase, Verdict,
};
