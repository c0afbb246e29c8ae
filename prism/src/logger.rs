use logforth::append;

use crate::args::Args;

pub(crate) fn init(args: &Args) {
    logforth::builder()
        .dispatch(|dispatch| dispatch.filter(args.log_level).append(append::Stderr::default()))
        .apply();
}
