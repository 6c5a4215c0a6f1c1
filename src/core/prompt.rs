//! Versioned classification prompts.
//!
//! The instruction text is part of the evaluation surface: change a template
//! only together with `PROMPT_VERSION`.

pub const PROMPT_VERSION: &str = "bank-statement/v1";

const DETAILS_ONLY_TEMPLATE: &str = "\
You are given bank statement text.
Extract:
1. Account Holder Details: Name, Address, Contact Nr, Email
2. Bank Account Details: Bank Name, Account Nr, IFSC Code, Bank Branch Address
Return in JSON format with keys: account_holder_details, bank_account_details.
Use these field names: account_holder_details {name, address, contact_nr, email}, \
bank_account_details {bank_name, account_nr, ifsc_code, bank_branch_address}. \
Use null for anything not present in the text.
Text:
";

const WITH_TRANSACTIONS_TEMPLATE: &str = "\
You are given bank statement text.
Extract:
1. Account Holder Details: Name, Address, Contact Nr, Email
2. Bank Account Details: Bank Name, Account Nr, IFSC Code, Bank Branch Address
3. Tabular Data of Transactions
Return in JSON format with keys: account_holder_details, bank_account_details, transactions.
Use these field names: account_holder_details {name, address, contact_nr, email}, \
bank_account_details {bank_name, account_nr, ifsc_code, bank_branch_address}; \
transactions is an array with one object per row keyed by the statement's column names. \
Use null for anything not present in the text.
Text:
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPrompt {
    version: &'static str,
    include_transactions: bool,
    text: String,
}

impl ClassificationPrompt {
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn includes_transactions(&self) -> bool {
        self.include_transactions
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub fn build_prompt(statement_text: &str, include_transactions: bool) -> ClassificationPrompt {
    let template = if include_transactions {
        WITH_TRANSACTIONS_TEMPLATE
    } else {
        DETAILS_ONLY_TEMPLATE
    };

    let mut text = String::with_capacity(template.len() + statement_text.len() + 1);
    text.push_str(template);
    text.push_str(statement_text);
    if !statement_text.ends_with('\n') {
        text.push('\n');
    }

    ClassificationPrompt {
        version: PROMPT_VERSION,
        include_transactions,
        text,
    }
}
